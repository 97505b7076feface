// Requêtes et réponses JSON de l'API (champs en camelCase côté client)
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{AllowedMovements, DimensionFormat, ListActionKind, MovementKind, TakeKind};
use super::{liste_item, produit};

// ----------------------------------------------------------------------------
// Liste (panier)
// ----------------------------------------------------------------------------

/// POST /api/liste/add, aussi la charge utile rejouée par la file hors-ligne
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
    #[validate(nested)]
    pub item: NouvelItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NouvelItem {
    pub type_action: ListActionKind,
    pub produit_id: Option<i32>,
    pub type_mouvement: Option<TakeKind>,
    pub movement_id: Option<i32>,
    #[validate(range(min = 0, max = 1000000))]
    pub quantite: i32,
    #[validate(range(min = 0, max = 1000000))]
    pub quantite_perdue: Option<i32>,
    pub longueur: Option<f64>,
    pub largeur: Option<f64>,
    #[validate(length(max = 64))]
    pub couleur: Option<String>,
}

/// Résultat d'un item appliqué lors de la validation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultatItem {
    pub item_id: i32,
    pub type_action: ListActionKind,
    pub produit_id: i32,
    pub movement_id: Option<i32>,
    pub quantite: i32,
    pub message: String,
}

/// GET /api/liste/{userId} : liste courante (vide si aucune liste ouverte)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeDetail {
    pub liste_id: Option<i32>,
    pub utilisateur_id: i32,
    pub items: Vec<liste_item::Model>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub success: bool,
    pub mouvements_crees: usize,
    pub results: Vec<ResultatItem>,
}

// ----------------------------------------------------------------------------
// Mouvements unitaires (hors liste)
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
    pub produit_id: i32,
    #[validate(range(min = 1, max = 1000000))]
    pub quantite: i32,
    pub type_mouvement: TakeKind,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub movement_id: i32,
    #[validate(range(min = 0, max = 1000000))]
    pub quantite: i32,
    #[validate(range(min = 0, max = 1000000))]
    pub quantite_perdue: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
    pub produit_id: i32,
    #[validate(range(min = 1, max = 1000000))]
    pub quantite: i32,
    pub longueur: Option<f64>,
    pub largeur: Option<f64>,
    #[validate(length(max = 64))]
    pub couleur: Option<String>,
}

// ----------------------------------------------------------------------------
// Produits
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutStock {
    EnStock,
    PasEnStock,
}

impl StatutStock {
    pub fn depuis_disponible(disponible: i32) -> Self {
        if disponible > 0 {
            StatutStock::EnStock
        } else {
            StatutStock::PasEnStock
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduitAvecStock {
    #[serde(flatten)]
    pub produit: produit::Model,
    pub stock_disponible: i32,
    pub statut_stock: StatutStock,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDisponibleResponse {
    pub produit_id: i32,
    pub stock_disponible: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduitRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
    #[validate(length(min = 1, max = 120))]
    pub categorie: String,
    #[serde(default)]
    pub sous_section: String,
    #[validate(length(min = 1, max = 200))]
    pub nom: String,
    #[validate(length(min = 1, max = 32))]
    pub unite: String,
    #[validate(range(min = 0, max = 1000000000))]
    #[serde(default)]
    pub stock_actuel: i32,
    #[validate(range(min = 0, max = 1000000000))]
    #[serde(default)]
    pub stock_minimum: i32,
    pub types_mouvements_autorises: AllowedMovements,
    #[serde(default)]
    pub est_template: bool,
    pub format_dimension: Option<DimensionFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduitRequest {
    #[validate(length(min = 1, max = 200))]
    pub nom: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unite: Option<String>,
    #[validate(range(min = 0, max = 1000000000))]
    pub stock_actuel: Option<i32>,
    #[validate(range(min = 0, max = 1000000000))]
    pub stock_minimum: Option<i32>,
    pub types_mouvements_autorises: Option<AllowedMovements>,
    pub actif: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProduitsQuery {
    pub categorie: Option<String>,
}

// ----------------------------------------------------------------------------
// Historique
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PretActifResponse {
    pub movement_id: i32,
    pub produit_id: i32,
    pub nom_produit: String,
    pub quantite: i32,
    #[serde(rename = "type")]
    pub type_mouvement: MovementKind,
    pub date: chrono::DateTime<chrono::Utc>,
    pub date_retour_prevu: Option<chrono::DateTime<chrono::Utc>>,
}
