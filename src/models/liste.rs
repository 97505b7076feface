use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Liste d'actions en attente (panier) : une seule liste ouverte par utilisateur
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub utilisateur_id: i32,
    pub date_creation: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::liste_item::Entity")]
    ListeItem,
}

impl Related<super::liste_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListeItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
