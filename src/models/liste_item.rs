use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{ListActionKind, TakeKind};

// Champs remplis selon type_action :
// - prendre : produit_id + type_mouvement
// - rendre  : movement_id (+ quantite_perdue)
// - deposer : produit_id (+ longueur/largeur/couleur pour un modèle)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "liste_items")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub liste_id: i32,
    pub type_action: ListActionKind,
    pub produit_id: Option<i32>,
    pub type_mouvement: Option<TakeKind>,
    pub movement_id: Option<i32>,
    pub quantite: i32,
    pub quantite_perdue: Option<i32>,
    pub longueur: Option<f64>,
    pub largeur: Option<f64>,
    pub couleur: Option<String>,
    pub date_ajout: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::liste::Entity",
        from = "Column::ListeId",
        to = "super::liste::Column::Id",
        on_delete = "Cascade"
    )]
    Liste,
}

impl Related<super::liste::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Liste.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
