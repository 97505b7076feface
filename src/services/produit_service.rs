use chrono::Utc;
use sea_orm::*;
use validator::Validate;

use crate::error::{StockError, StockResult};
use crate::models::dto::{CreateProduitRequest, ProduitAvecStock, StatutStock, UpdateProduitRequest};
use crate::models::enums::ProductStatus;
use crate::models::produit;
use crate::services::stock_cache::StockCache;
use crate::services::stock_service::StockService;

pub struct ProduitService;

impl ProduitService {
    /// Catalogue des prises : produits validés, actifs, hors modèles
    pub async fn list_with_stock<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        categorie: Option<&str>,
    ) -> StockResult<Vec<ProduitAvecStock>> {
        let mut requete = produit::Entity::find()
            .filter(produit::Column::Statut.eq(ProductStatus::Valide))
            .filter(produit::Column::Actif.eq(true))
            .filter(produit::Column::EstTemplate.eq(false));

        if let Some(categorie) = categorie {
            requete = requete.filter(produit::Column::Categorie.eq(categorie));
        }

        let produits = requete
            .order_by_asc(produit::Column::Categorie)
            .order_by_asc(produit::Column::SousSection)
            .order_by_asc(produit::Column::Nom)
            .all(db)
            .await?;

        let disponibles = StockService::available_stock_batch(db, cache, &produits).await?;

        Ok(produits
            .into_iter()
            .map(|produit| {
                let stock_disponible = disponibles.get(&produit.id).copied().unwrap_or(produit.stock_actuel);
                ProduitAvecStock {
                    produit,
                    stock_disponible,
                    statut_stock: StatutStock::depuis_disponible(stock_disponible),
                }
            })
            .collect())
    }

    /// Modèles actifs, pour les formulaires de dépôt
    pub async fn templates<C: ConnectionTrait>(db: &C) -> Result<Vec<produit::Model>, DbErr> {
        produit::Entity::find()
            .filter(produit::Column::EstTemplate.eq(true))
            .filter(produit::Column::Actif.eq(true))
            .order_by_asc(produit::Column::Nom)
            .all(db)
            .await
    }

    /// Nouveau produit proposé par un utilisateur : en attente de revue
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        request: CreateProduitRequest,
    ) -> StockResult<produit::Model> {
        request.validate()?;

        if request.est_template && request.format_dimension.is_none() {
            return Err(StockError::validation("Un modèle doit préciser son format (surface ou rouleau)"));
        }

        let produit = produit::ActiveModel {
            categorie: Set(request.categorie.trim().to_string()),
            sous_section: Set(request.sous_section.trim().to_string()),
            nom: Set(request.nom.trim().to_string()),
            unite: Set(request.unite.trim().to_string()),
            // un modèle n'a jamais de stock propre
            stock_actuel: Set(if request.est_template { 0 } else { request.stock_actuel }),
            stock_minimum: Set(request.stock_minimum),
            statut: Set(ProductStatus::EnAttente),
            types_mouvements_autorises: Set(request.types_mouvements_autorises),
            actif: Set(true),
            est_template: Set(request.est_template),
            est_variante: Set(false),
            format_dimension: Set(request.format_dimension),
            longueur: Set(None),
            largeur: Set(None),
            couleur: Set(None),
            cree_par: Set(Some(request.user_id)),
            date_creation: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        cache.invalidate(produit.id);
        tracing::info!(produit_id = produit.id, nom = %produit.nom, "produit proposé, en attente de validation");
        Ok(produit)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        produit_id: i32,
        request: UpdateProduitRequest,
    ) -> StockResult<produit::Model> {
        request.validate()?;

        let produit = produit::Entity::find_by_id(produit_id)
            .one(db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Produit {} introuvable", produit_id)))?;

        if produit.est_template && request.stock_actuel.is_some_and(|s| s != 0) {
            return Err(StockError::invalid_state("Un modèle ne porte pas de stock"));
        }

        let mut produit: produit::ActiveModel = produit.into();
        if let Some(nom) = request.nom {
            produit.nom = Set(nom.trim().to_string());
        }
        if let Some(unite) = request.unite {
            produit.unite = Set(unite.trim().to_string());
        }
        if let Some(stock_actuel) = request.stock_actuel {
            produit.stock_actuel = Set(stock_actuel);
        }
        if let Some(stock_minimum) = request.stock_minimum {
            produit.stock_minimum = Set(stock_minimum);
        }
        if let Some(types) = request.types_mouvements_autorises {
            produit.types_mouvements_autorises = Set(types);
        }
        if let Some(actif) = request.actif {
            produit.actif = Set(actif);
        }

        let produit = produit.update(db).await?;
        cache.invalidate(produit.id);
        Ok(produit)
    }

    /// Revue : en_attente → valide
    pub async fn valider<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        produit_id: i32,
    ) -> StockResult<produit::Model> {
        let produit = produit::Entity::find_by_id(produit_id)
            .one(db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Produit {} introuvable", produit_id)))?;

        if produit.statut == ProductStatus::Valide {
            return Err(StockError::invalid_state(format!("{} est déjà validé", produit.nom)));
        }

        let mut produit: produit::ActiveModel = produit.into();
        produit.statut = Set(ProductStatus::Valide);
        let produit = produit.update(db).await?;

        cache.invalidate(produit.id);
        tracing::info!(produit_id = produit.id, "produit validé");
        Ok(produit)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::enums::{AllowedMovements, DimensionFormat, TakeKind};
    use crate::services::mouvement_service::MouvementService;
    use crate::test_support::{insert_produit, memory_db, produit_fixture, template_fixture};

    fn demande(nom: &str) -> CreateProduitRequest {
        CreateProduitRequest {
            user_id: 9,
            categorie: "Outillage".to_string(),
            sous_section: "Mesure".to_string(),
            nom: nom.to_string(),
            unite: "pièce".to_string(),
            stock_actuel: 4,
            stock_minimum: 1,
            types_mouvements_autorises: AllowedMovements::Pret,
            est_template: false,
            format_dimension: None,
        }
    }

    #[tokio::test]
    async fn catalogue_filtre_et_statut_stock() {
        let db = memory_db().await;
        let cache = StockCache::new(Duration::from_secs(60));
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 2, AllowedMovements::LesDeux)).await;
        insert_produit(&db, template_fixture("Géomembrane (modèle)", DimensionFormat::Surface)).await;
        let mut inactif = produit_fixture("Ancienne scie", 3, AllowedMovements::Pret);
        inactif.actif = Set(false);
        insert_produit(&db, inactif).await;
        ProduitService::create(&db, &cache, demande("Télémètre")).await.unwrap();

        MouvementService::prendre(&db, 1, perceuse.id, TakeKind::Pret, 2, chrono::Duration::days(15))
            .await
            .unwrap();

        let catalogue = ProduitService::list_with_stock(&db, &cache, None).await.unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].produit.id, perceuse.id);
        assert_eq!(catalogue[0].stock_disponible, 0);
        assert_eq!(catalogue[0].statut_stock, StatutStock::PasEnStock);

        let autre = ProduitService::list_with_stock(&db, &cache, Some("Géomembranes")).await.unwrap();
        assert!(autre.is_empty());
    }

    #[tokio::test]
    async fn proposition_puis_revue() {
        let db = memory_db().await;
        let cache = StockCache::new(Duration::from_secs(60));

        let propose = ProduitService::create(&db, &cache, demande("Télémètre")).await.unwrap();
        assert_eq!(propose.statut, ProductStatus::EnAttente);
        assert_eq!(propose.cree_par, Some(9));

        let err = MouvementService::prendre(&db, 1, propose.id, TakeKind::Pret, 1, chrono::Duration::days(15))
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidState(_)));

        let valide = ProduitService::valider(&db, &cache, propose.id).await.unwrap();
        assert_eq!(valide.statut, ProductStatus::Valide);
        assert!(matches!(
            ProduitService::valider(&db, &cache, propose.id).await.unwrap_err(),
            StockError::InvalidState(_)
        ));

        let catalogue = ProduitService::list_with_stock(&db, &cache, Some("Outillage")).await.unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].statut_stock, StatutStock::EnStock);
    }

    #[tokio::test]
    async fn modele_sans_format_refuse() {
        let db = memory_db().await;
        let cache = StockCache::disabled();
        let mut requete = demande("Bâche (modèle)");
        requete.est_template = true;

        let err = ProduitService::create(&db, &cache, requete).await.unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    #[tokio::test]
    async fn modification_invalide_le_cache() {
        let db = memory_db().await;
        let cache = StockCache::new(Duration::from_secs(60));
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 2, AllowedMovements::LesDeux)).await;
        cache.put(perceuse.id, 2);

        let modifie = ProduitService::update(
            &db,
            &cache,
            perceuse.id,
            UpdateProduitRequest {
                stock_actuel: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(modifie.stock_actuel, 6);
        assert_eq!(cache.get(perceuse.id), None);
        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn modeles_listes() {
        let db = memory_db().await;
        insert_produit(&db, template_fixture("Géomembrane (modèle)", DimensionFormat::Surface)).await;
        insert_produit(&db, produit_fixture("Perceuse", 2, AllowedMovements::LesDeux)).await;

        let modeles = ProduitService::templates(&db).await.unwrap();
        assert_eq!(modeles.len(), 1);
        assert!(modeles[0].est_template);
    }
}
