use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

use crate::models::dto::AddItemRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// En attente d'envoi
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Refusée par le serveur ou tentatives épuisées : relance manuelle seulement
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actions_en_attente")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub utilisateur_id: i32,
    // Ordre d'insertion, les dates pouvant être égales
    pub sequence: i64,
    // Corps de POST /api/liste/add
    pub payload: Json,
    pub statut: PendingStatus,
    pub tentatives: i32,
    pub erreur: Option<String>,
    pub date_creation: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn requete(&self) -> Result<AddItemRequest, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
