use chrono::Utc;
use sea_orm::*;

use crate::error::{StockError, StockResult};
use crate::models::enums::{DimensionFormat, ProductStatus};
use crate::models::produit;

/// Suffixe qui marque le nom d'un modèle : "Géomembrane EPDM (modèle)"
pub const MARQUEUR_TEMPLATE: &str = "(modèle)";

/// Rouleau entamé : en dessous, c'est une chute ; au-delà, un rouleau complet
pub const LONGUEUR_ROULEAU_MIN: f64 = 10.0;
pub const LONGUEUR_ROULEAU_MAX: f64 = 100.0;

/// Dimensions saisies lors d'un dépôt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub longueur: Option<f64>,
    pub largeur: Option<f64>,
    pub couleur: Option<String>,
}

impl Dimensions {
    pub fn est_vide(&self) -> bool {
        self.longueur.is_none() && self.largeur.is_none()
    }

    fn couleur_normalisee(&self) -> Option<String> {
        self.couleur
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// Clé d'une variante concrète, dimensions déjà normalisées
#[derive(Debug, Clone, PartialEq)]
pub struct CleVariante {
    pub format: DimensionFormat,
    pub longueur: f64,
    pub largeur: Option<f64>,
    pub couleur: Option<String>,
}

pub struct VariantService;

impl VariantService {
    /// Garde-fous du rouleau entamé, appliqués avant toute résolution
    pub fn valider_longueur_rouleau(longueur: Option<f64>) -> StockResult<f64> {
        let longueur = match longueur {
            Some(l) if l.is_finite() => l,
            Some(_) => return Err(StockError::validation("Longueur du rouleau invalide")),
            None => return Err(StockError::validation("Longueur du rouleau manquante")),
        };

        if longueur < LONGUEUR_ROULEAU_MIN {
            return Err(StockError::validation(format!(
                "Longueur de {}m inférieure à {}m : déposez-la comme chute",
                format_dimension(longueur),
                format_dimension(LONGUEUR_ROULEAU_MIN)
            )));
        }

        if longueur >= LONGUEUR_ROULEAU_MAX {
            return Err(StockError::validation(format!(
                "Longueur de {}m : déposez un rouleau complet plutôt qu'un rouleau entamé",
                format_dimension(longueur)
            )));
        }

        Ok(longueur)
    }

    /// Valide les dimensions d'un dépôt sur modèle et calcule la clé de variante
    /// En surface, les dimensions sont triées : 2x5 et 5x2 donnent la même clé
    pub fn normaliser(template: &produit::Model, dimensions: &Dimensions) -> StockResult<CleVariante> {
        if !template.est_template {
            return Err(StockError::invalid_state(format!(
                "{} n'est pas un modèle",
                template.nom
            )));
        }

        let format = template.format_dimension.ok_or_else(|| {
            StockError::invalid_state(format!("Le modèle {} n'a pas de format de dimension", template.nom))
        })?;

        if dimensions.est_vide() {
            return Err(StockError::invalid_state(format!(
                "{} est un modèle : indiquez les dimensions déposées",
                template.nom
            )));
        }

        let couleur = dimensions.couleur_normalisee();

        match format {
            DimensionFormat::Rouleau => {
                let longueur = Self::valider_longueur_rouleau(dimensions.longueur)?;
                Ok(CleVariante { format, longueur, largeur: None, couleur })
            }
            DimensionFormat::Surface => {
                let (a, b) = match (dimensions.longueur, dimensions.largeur) {
                    (Some(a), Some(b)) if a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0 => (a, b),
                    _ => {
                        return Err(StockError::validation(
                            "Longueur et largeur positives requises pour une découpe",
                        ))
                    }
                };
                let (petite, grande) = if a <= b { (a, b) } else { (b, a) };
                Ok(CleVariante { format, longueur: grande, largeur: Some(petite), couleur })
            }
        }
    }

    /// Nom lisible de la variante : nom du modèle sans marqueur + dimensions
    pub fn nom_variante(template_nom: &str, cle: &CleVariante) -> String {
        let base = strip_marqueur(template_nom);

        let nom = match (cle.format, cle.largeur) {
            (DimensionFormat::Surface, Some(petite)) => format!(
                "{} {}x{}m",
                base,
                format_dimension(petite),
                format_dimension(cle.longueur)
            ),
            _ => format!("{} ({}m)", base, format_dimension(cle.longueur)),
        };

        match &cle.couleur {
            Some(couleur) => format!("{} - {}", nom, couleur),
            None => nom,
        }
    }

    /// Cherche la variante concrète correspondant au dépôt, ou la crée à stock 0
    /// Retourne (variante, créée ?)
    /// Une variante inactive trouvée est réactivée par le dépôt lui-même
    pub async fn resolve_variant<C: ConnectionTrait>(
        db: &C,
        template: &produit::Model,
        dimensions: &Dimensions,
        utilisateur_id: i32,
    ) -> StockResult<(produit::Model, bool)> {
        let cle = Self::normaliser(template, dimensions)?;
        let nom = Self::nom_variante(&template.nom, &cle);

        // le nom canonique porte le matériau du modèle : deux modèles d'une même
        // sous-section ne partagent jamais leurs variantes
        let mut recherche = produit::Entity::find()
            .filter(produit::Column::Categorie.eq(template.categorie.as_str()))
            .filter(produit::Column::SousSection.eq(template.sous_section.as_str()))
            .filter(produit::Column::EstTemplate.eq(false))
            .filter(produit::Column::EstVariante.eq(true))
            .filter(produit::Column::FormatDimension.eq(cle.format))
            .filter(produit::Column::Nom.eq(nom.as_str()))
            .filter(produit::Column::Longueur.eq(cle.longueur));

        recherche = match cle.largeur {
            Some(largeur) => recherche.filter(produit::Column::Largeur.eq(largeur)),
            None => recherche.filter(produit::Column::Largeur.is_null()),
        };
        recherche = match &cle.couleur {
            Some(couleur) => recherche.filter(produit::Column::Couleur.eq(couleur.as_str())),
            None => recherche.filter(produit::Column::Couleur.is_null()),
        };

        if let Some(existante) = recherche.order_by_asc(produit::Column::Id).one(db).await? {
            tracing::debug!(variante_id = existante.id, template_id = template.id, "variante existante");
            return Ok((existante, false));
        }

        let nouvelle = produit::ActiveModel {
            categorie: Set(template.categorie.clone()),
            sous_section: Set(template.sous_section.clone()),
            nom: Set(nom),
            unite: Set(template.unite.clone()),
            stock_actuel: Set(0),
            stock_minimum: Set(template.stock_minimum),
            statut: Set(ProductStatus::Valide),
            types_mouvements_autorises: Set(template.types_mouvements_autorises),
            actif: Set(true),
            est_template: Set(false),
            est_variante: Set(true),
            format_dimension: Set(Some(cle.format)),
            longueur: Set(Some(cle.longueur)),
            largeur: Set(cle.largeur),
            couleur: Set(cle.couleur.clone()),
            cree_par: Set(Some(utilisateur_id)),
            date_creation: Set(Utc::now()),
            ..Default::default()
        };

        let variante = nouvelle.insert(db).await?;
        tracing::info!(
            variante_id = variante.id,
            template_id = template.id,
            nom = %variante.nom,
            "nouvelle variante créée"
        );

        Ok((variante, true))
    }
}

/// Retire le marqueur de modèle en fin de nom (insensible à la casse)
pub fn strip_marqueur(nom: &str) -> &str {
    let nom = nom.trim_end();
    let marqueur = MARQUEUR_TEMPLATE;

    if nom.len() >= marqueur.len() {
        let coupure = nom.len() - marqueur.len();
        if nom.is_char_boundary(coupure) && nom[coupure..].to_lowercase() == marqueur {
            return nom[..coupure].trim_end();
        }
    }
    nom
}

/// 2.0 → "2", 2.5 → "2.5"
pub fn format_dimension(valeur: f64) -> String {
    if valeur.fract() == 0.0 {
        format!("{}", valeur as i64)
    } else {
        format!("{}", valeur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_produit, memory_db, template_fixture};

    fn dims(longueur: f64, largeur: Option<f64>, couleur: Option<&str>) -> Dimensions {
        Dimensions {
            longueur: Some(longueur),
            largeur,
            couleur: couleur.map(str::to_string),
        }
    }

    #[test]
    fn marqueur_retire() {
        assert_eq!(strip_marqueur("Géomembrane EPDM (modèle)"), "Géomembrane EPDM");
        assert_eq!(strip_marqueur("Géomembrane EPDM (MODÈLE)  "), "Géomembrane EPDM");
        assert_eq!(strip_marqueur("Tuyau PE"), "Tuyau PE");
    }

    #[test]
    fn format_des_dimensions() {
        assert_eq!(format_dimension(2.0), "2");
        assert_eq!(format_dimension(2.5), "2.5");
        assert_eq!(format_dimension(12.0), "12");
    }

    #[test]
    fn garde_fous_rouleau() {
        assert!(matches!(
            VariantService::valider_longueur_rouleau(None),
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            VariantService::valider_longueur_rouleau(Some(f64::NAN)),
            Err(StockError::Validation(_))
        ));
        let chute = VariantService::valider_longueur_rouleau(Some(9.5)).unwrap_err();
        assert!(chute.to_string().contains("chute"));
        let complet = VariantService::valider_longueur_rouleau(Some(100.0)).unwrap_err();
        assert!(complet.to_string().contains("rouleau complet"));
        assert_eq!(VariantService::valider_longueur_rouleau(Some(10.0)).unwrap(), 10.0);
        assert_eq!(VariantService::valider_longueur_rouleau(Some(99.9)).unwrap(), 99.9);
    }

    #[test]
    fn nom_surface_trie_les_dimensions() {
        let cle = CleVariante {
            format: DimensionFormat::Surface,
            longueur: 5.0,
            largeur: Some(2.0),
            couleur: Some("rouge".to_string()),
        };
        assert_eq!(
            VariantService::nom_variante("Géomembrane (modèle)", &cle),
            "Géomembrane 2x5m - rouge"
        );
    }

    #[test]
    fn nom_rouleau() {
        let cle = CleVariante {
            format: DimensionFormat::Rouleau,
            longueur: 42.5,
            largeur: None,
            couleur: None,
        };
        assert_eq!(VariantService::nom_variante("Tuyau PE JR (modèle)", &cle), "Tuyau PE JR (42.5m)");
    }

    #[tokio::test]
    async fn meme_variante_quel_que_soit_l_ordre() {
        let db = memory_db().await;
        let template = insert_produit(&db, template_fixture("Géomembrane (modèle)", DimensionFormat::Surface)).await;

        let (premiere, creee) = VariantService::resolve_variant(&db, &template, &dims(2.0, Some(5.0), Some("rouge")), 1)
            .await
            .unwrap();
        assert!(creee);
        assert_eq!(premiere.nom, "Géomembrane 2x5m - rouge");
        assert_eq!(premiere.stock_actuel, 0);
        assert!(premiere.est_variante && !premiere.est_template);
        assert_eq!(premiere.types_mouvements_autorises, template.types_mouvements_autorises);

        let (seconde, creee) = VariantService::resolve_variant(&db, &template, &dims(5.0, Some(2.0), Some(" rouge ")), 2)
            .await
            .unwrap();
        assert!(!creee);
        assert_eq!(seconde.id, premiere.id);
    }

    #[tokio::test]
    async fn couleur_differente_autre_variante() {
        let db = memory_db().await;
        let template = insert_produit(&db, template_fixture("Géomembrane (modèle)", DimensionFormat::Surface)).await;

        let (rouge, _) = VariantService::resolve_variant(&db, &template, &dims(2.0, Some(5.0), Some("rouge")), 1)
            .await
            .unwrap();
        let (sans_couleur, creee) = VariantService::resolve_variant(&db, &template, &dims(2.0, Some(5.0), None), 1)
            .await
            .unwrap();
        assert!(creee);
        assert_ne!(rouge.id, sans_couleur.id);
    }

    #[tokio::test]
    async fn modele_sans_dimensions_refuse() {
        let db = memory_db().await;
        let template = insert_produit(&db, template_fixture("Géomembrane (modèle)", DimensionFormat::Surface)).await;

        let err = VariantService::resolve_variant(&db, &template, &Dimensions::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rouleau_trop_court_refuse_avant_resolution() {
        let db = memory_db().await;
        let template = insert_produit(&db, template_fixture("Tuyau PE JR (modèle)", DimensionFormat::Rouleau)).await;

        let err = VariantService::resolve_variant(&db, &template, &dims(5.0, None, None), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
        let total = produit::Entity::find().count(&db).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn deux_modeles_d_une_sous_section_ne_partagent_pas_leurs_variantes() {
        let db = memory_db().await;
        let jr = insert_produit(&db, template_fixture("Tuyau PE JR (modèle)", DimensionFormat::Rouleau)).await;
        let hd = insert_produit(&db, template_fixture("Tuyau PE HD (modèle)", DimensionFormat::Rouleau)).await;

        let (variante_jr, _) = VariantService::resolve_variant(&db, &jr, &dims(42.0, None, None), 1)
            .await
            .unwrap();
        let (variante_hd, creee) = VariantService::resolve_variant(&db, &hd, &dims(42.0, None, None), 1)
            .await
            .unwrap();

        assert!(creee);
        assert_ne!(variante_jr.id, variante_hd.id);
        assert_eq!(variante_hd.nom, "Tuyau PE HD (42m)");

        let (encore_jr, creee) = VariantService::resolve_variant(&db, &jr, &dims(42.0, None, None), 2)
            .await
            .unwrap();
        assert!(!creee);
        assert_eq!(encore_jr.id, variante_jr.id);
    }
}
