use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::AlertKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alertes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub utilisateur_id: i32,
    pub type_alerte: AlertKind,
    pub message: String,
    pub produit_id: Option<i32>,
    pub movement_id: Option<i32>,
    pub lue: bool,
    pub date_creation: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
