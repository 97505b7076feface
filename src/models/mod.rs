// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM.
//
// Liste des modules:
//   - enums : discriminants métier (types de mouvements, statuts, actions)
//   - produit : Produits, modèles (templates) et variantes dimensionnées
//   - mouvement : Registre des mouvements (prêt/consommation/dépôt/retour)
//   - liste : Liste d'actions en attente d'un utilisateur (panier)
//   - liste_item : Actions d'une liste (prendre/rendre/deposer)
//   - alerte : Notifications destinées aux utilisateurs
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//   - health : Health check API
//
// Points d'attention:
//   - Un modèle (est_template) n'est jamais référencé par un mouvement
//   - La ligne d'un prêt représente ce qui reste dehors, pas l'historique
//
// ============================================================================

pub mod enums;
pub mod produit;
pub mod mouvement;
pub mod liste;
pub mod liste_item;
pub mod alerte;
pub mod dto;
pub mod health;
