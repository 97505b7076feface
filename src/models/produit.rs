use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{AllowedMovements, DimensionFormat, ProductStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "produits")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub categorie: String,
    pub sous_section: String,
    pub nom: String,
    pub unite: String,

    // Stock physique présent au local (les prêts en cours y sont inclus)
    pub stock_actuel: i32,
    pub stock_minimum: i32,
    pub statut: ProductStatus,
    pub types_mouvements_autorises: AllowedMovements,

    // Suppression douce : un produit inactif n'apparaît plus dans les prises
    pub actif: bool,

    // Modèle abstrait (jamais stocké directement) d'où dérivent les variantes
    pub est_template: bool,

    // Variante concrète dimensionnée, désactivée automatiquement à stock 0
    pub est_variante: bool,
    pub format_dimension: Option<DimensionFormat>,
    pub longueur: Option<f64>,
    pub largeur: Option<f64>,
    pub couleur: Option<String>,
    pub cree_par: Option<i32>,
    pub date_creation: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mouvement::Entity")]
    Mouvement,
}

impl Related<super::mouvement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mouvement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Variante dimensionnée concrète (soumise à la désactivation à stock 0)
    pub fn est_variante_dimensionnee(&self) -> bool {
        self.est_variante && !self.est_template
    }
}
