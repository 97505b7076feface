use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{MovementKind, MovementStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mouvements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub date: DateTimeUtc,
    pub utilisateur_id: i32,
    pub produit_id: i32,

    // Pour un prêt : quantité encore dehors (diminue à chaque retour partiel)
    // Exemple:
    // - Prêt de 5     → quantite=5, statut=en_cours
    // - Retour de 2   → quantite=3 + une ligne "retour" de 2 (terminée)
    // - Retour de 3   → quantite=3, statut=termine
    pub quantite: i32,
    #[serde(rename = "type")]
    #[sea_orm(column_name = "type")]
    pub type_mouvement: MovementKind,
    pub statut: MovementStatus,
    pub date_retour_prevu: Option<DateTimeUtc>,
    pub date_retour_effectif: Option<DateTimeUtc>,
    pub quantite_perdue: Option<i32>,

    // Lignes "retour" : le prêt d'origine partiellement soldé
    pub mouvement_origine_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::produit::Entity",
        from = "Column::ProduitId",
        to = "super::produit::Column::Id"
    )]
    Produit,
}

impl Related<super::produit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Produit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Un prêt compte contre le stock disponible tant qu'il est en cours
    pub fn est_pret_actif(&self) -> bool {
        self.type_mouvement == MovementKind::Pret && self.statut == MovementStatus::EnCours
    }
}
