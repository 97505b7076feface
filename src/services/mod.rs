// ============================================================================
// SERVICES - RÈGLES MÉTIER
// ============================================================================
//
//   - stock_cache : projection en mémoire du disponible par produit
//   - stock_service : calcul du disponible (direct, en cache, groupé)
//   - variant_service : résolution des variantes dimensionnées d'un modèle
//   - mouvement_service : prises, retours, dépôts et verrous de stock
//   - liste_service : panier d'un utilisateur et sa validation atomique
//   - produit_service : catalogue et revue des produits proposés
//   - notification_service : alertes envoyées après validation
//
// ============================================================================

pub mod stock_cache;
pub mod stock_service;
pub mod variant_service;
pub mod mouvement_service;
pub mod liste_service;
pub mod produit_service;
pub mod notification_service;
