// ============================================================================
// OFFLINE - FILE D'ACTIONS HORS-LIGNE (CÔTÉ CLIENT)
// ============================================================================
//
// Description:
//   Quand le poste n'a pas de réseau, les ajouts à la liste sont gardés dans
//   une base SQLite locale puis rejoués vers POST /api/liste/add.
//
// Liste des modules:
//   - action : entité `actions_en_attente` (une action = une requête d'ajout)
//   - queue : stockage durable, capacité et vieillissement
//   - client : envoi HTTP et classement des échecs (transitoire / définitif)
//   - sync : rejeu séquentiel avec nouvelles tentatives
//
// Points d'attention:
//   - Jamais plus de 50 actions en attente
//   - Une action de plus de 7 jours est abandonnée au chargement
//   - Un échec définitif (4xx) n'est jamais retenté automatiquement
//
// ============================================================================

pub mod action;
pub mod queue;
pub mod client;
pub mod sync;

pub use action::PendingStatus;
pub use client::{HttpListeClient, ListeClient, SubmitError};
pub use queue::{OfflineQueue, QueueError};
pub use sync::{FlushReport, OfflineSync, RetryPolicy};
