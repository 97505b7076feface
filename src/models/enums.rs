// ============================================================================
// ENUMS PARTAGÉS
// ============================================================================
//
// Chaque discriminant métier est une énumération fermée, stockée en texte
// dans la base (DeriveActiveEnum) et sérialisée en snake_case dans le JSON.
//
// ============================================================================

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

/// Statut de revue d'un produit
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[sea_orm(string_value = "en_attente")]
    EnAttente,
    #[sea_orm(string_value = "valide")]
    Valide,
}

/// Types de mouvements qu'un produit accepte lors d'une prise
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum AllowedMovements {
    #[sea_orm(string_value = "pret")]
    Pret,
    #[sea_orm(string_value = "consommation")]
    Consommation,
    #[sea_orm(string_value = "les_deux")]
    LesDeux,
}

impl AllowedMovements {
    pub fn permet(self, prise: TakeKind) -> bool {
        match (self, prise) {
            (AllowedMovements::LesDeux, _) => true,
            (AllowedMovements::Pret, TakeKind::Pret) => true,
            (AllowedMovements::Consommation, TakeKind::Consommation) => true,
            (AllowedMovements::Pret, TakeKind::Consommation)
            | (AllowedMovements::Consommation, TakeKind::Pret) => false,
        }
    }
}

/// Format des dimensions d'un modèle ou d'une variante
/// - surface : deux dimensions (géomembrane découpée)
/// - rouleau : une seule longueur (rouleau entamé, "JR")
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DimensionFormat {
    #[sea_orm(string_value = "surface")]
    Surface,
    #[sea_orm(string_value = "rouleau")]
    Rouleau,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    #[sea_orm(string_value = "pret")]
    Pret,
    #[sea_orm(string_value = "consommation")]
    Consommation,
    #[sea_orm(string_value = "depot")]
    Depot,
    #[sea_orm(string_value = "retour")]
    Retour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    #[sea_orm(string_value = "en_cours")]
    EnCours,
    #[sea_orm(string_value = "termine")]
    Termine,
}

/// Sous-type d'une prise : prêt (retour attendu) ou consommation
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TakeKind {
    #[sea_orm(string_value = "pret")]
    Pret,
    #[sea_orm(string_value = "consommation")]
    Consommation,
}

impl From<TakeKind> for MovementKind {
    fn from(prise: TakeKind) -> Self {
        match prise {
            TakeKind::Pret => MovementKind::Pret,
            TakeKind::Consommation => MovementKind::Consommation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ListActionKind {
    #[sea_orm(string_value = "prendre")]
    Prendre,
    #[sea_orm(string_value = "rendre")]
    Rendre,
    #[sea_orm(string_value = "deposer")]
    Deposer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    #[sea_orm(string_value = "liste_validee")]
    ListeValidee,
    #[sea_orm(string_value = "stock_bas")]
    StockBas,
}
