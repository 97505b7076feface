use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::error::{StockError, StockResult};
use crate::models::enums::{MovementKind, MovementStatus};
use crate::models::{mouvement, produit};
use crate::services::stock_cache::StockCache;

pub struct StockService;

impl StockService {
    /// Stock disponible = stock physique - quantités en prêt actif
    /// Lecture directe, sans cache : c'est la valeur utilisée à la validation
    pub async fn compute_available_stock<C: ConnectionTrait>(
        db: &C,
        produit_id: i32,
    ) -> StockResult<i32> {
        let produit = produit::Entity::find_by_id(produit_id)
            .one(db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Produit {} introuvable", produit_id)))?;

        Self::available_for(db, &produit).await
    }

    /// Même calcul pour un produit déjà chargé
    pub async fn available_for<C: ConnectionTrait>(
        db: &C,
        produit: &produit::Model,
    ) -> StockResult<i32> {
        let en_pret = Self::quantite_en_pret(db, produit.id).await?;
        Ok(produit.stock_actuel - en_pret)
    }

    /// Somme des quantités des prêts en cours sur un produit
    pub async fn quantite_en_pret<C: ConnectionTrait>(db: &C, produit_id: i32) -> Result<i32, DbErr> {
        let total = mouvement::Entity::find()
            .select_only()
            .column_as(Expr::col(mouvement::Column::Quantite).sum(), "total")
            .filter(mouvement::Column::ProduitId.eq(produit_id))
            .filter(mouvement::Column::TypeMouvement.eq(MovementKind::Pret))
            .filter(mouvement::Column::Statut.eq(MovementStatus::EnCours))
            .into_tuple::<Option<i64>>()
            .one(db)
            .await?;

        //Some(Some(n)) → n
        //Some(None) → 0 (SUM() sur aucune ligne retourne NULL)
        Ok(total.flatten().unwrap_or(0) as i32)
    }

    /// Version mise en cache, pour l'affichage (jamais pour valider une prise)
    pub async fn available_stock<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        produit_id: i32,
    ) -> StockResult<i32> {
        if let Some(disponible) = cache.get(produit_id) {
            tracing::debug!(produit_id, disponible, "stock disponible servi depuis le cache");
            return Ok(disponible);
        }

        let disponible = Self::compute_available_stock(db, produit_id).await?;
        cache.put(produit_id, disponible);
        Ok(disponible)
    }

    /// Disponible de plusieurs produits : une seule requête groupée pour les prêts
    /// Les valeurs déjà en cache sont réutilisées, les autres y sont ajoutées
    pub async fn available_stock_batch<C: ConnectionTrait>(
        db: &C,
        cache: &StockCache,
        produits: &[produit::Model],
    ) -> StockResult<HashMap<i32, i32>> {
        let mut disponibles: HashMap<i32, i32> = HashMap::with_capacity(produits.len());
        let mut manquants: Vec<&produit::Model> = Vec::new();

        for produit in produits {
            match cache.get(produit.id) {
                Some(disponible) => {
                    disponibles.insert(produit.id, disponible);
                }
                None => manquants.push(produit),
            }
        }

        if manquants.is_empty() {
            return Ok(disponibles);
        }

        let ids: Vec<i32> = manquants.iter().map(|p| p.id).collect();
        let prets: HashMap<i32, i64> = mouvement::Entity::find()
            .select_only()
            .column(mouvement::Column::ProduitId)
            .column_as(Expr::col(mouvement::Column::Quantite).sum(), "total")
            .filter(mouvement::Column::ProduitId.is_in(ids))
            .filter(mouvement::Column::TypeMouvement.eq(MovementKind::Pret))
            .filter(mouvement::Column::Statut.eq(MovementStatus::EnCours))
            .group_by(mouvement::Column::ProduitId)
            .into_tuple::<(i32, Option<i64>)>()
            .all(db)
            .await?
            .into_iter()
            .map(|(produit_id, total)| (produit_id, total.unwrap_or(0)))
            .collect();

        for produit in manquants {
            let en_pret = prets.get(&produit.id).copied().unwrap_or(0) as i32;
            let disponible = produit.stock_actuel - en_pret;
            cache.put(produit.id, disponible);
            disponibles.insert(produit.id, disponible);
        }

        Ok(disponibles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{AllowedMovements, TakeKind};
    use crate::services::mouvement_service::MouvementService;
    use crate::test_support::{insert_produit, memory_db, produit_fixture};
    use std::time::Duration;

    #[tokio::test]
    async fn disponible_sans_mouvement() {
        let db = memory_db().await;
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;

        assert_eq!(StockService::compute_available_stock(&db, perceuse.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn produit_inconnu() {
        let db = memory_db().await;
        let err = StockService::compute_available_stock(&db, 999).await.unwrap_err();
        assert!(matches!(err, StockError::NotFound(_)));
    }

    #[tokio::test]
    async fn seuls_les_prets_en_cours_comptent() {
        let db = memory_db().await;
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;
        let duree = chrono::Duration::days(15);

        let pret = MouvementService::prendre(&db, 1, perceuse.id, TakeKind::Pret, 3, duree).await.unwrap();
        MouvementService::prendre(&db, 2, perceuse.id, TakeKind::Pret, 2, duree).await.unwrap();
        // la consommation baisse le stock physique, pas les prêts
        MouvementService::prendre(&db, 1, perceuse.id, TakeKind::Consommation, 1, duree).await.unwrap();

        let produit = produit::Entity::find_by_id(perceuse.id).one(&db).await.unwrap().unwrap();
        assert_eq!(produit.stock_actuel, 9);
        assert_eq!(StockService::quantite_en_pret(&db, perceuse.id).await.unwrap(), 5);
        assert_eq!(StockService::compute_available_stock(&db, perceuse.id).await.unwrap(), 4);

        MouvementService::rendre(&db, pret.mouvement.id, 3, 0).await.unwrap();
        assert_eq!(StockService::compute_available_stock(&db, perceuse.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn le_cache_sert_la_valeur_jusqu_a_invalidation() {
        let db = memory_db().await;
        let cache = StockCache::new(Duration::from_secs(60));
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;

        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 10);

        MouvementService::prendre(&db, 1, perceuse.id, TakeKind::Pret, 4, chrono::Duration::days(15))
            .await
            .unwrap();
        // valeur en cache inchangée tant qu'on n'invalide pas
        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 10);

        cache.invalidate(perceuse.id);
        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn ttl_nul_reste_exact() {
        let db = memory_db().await;
        let cache = StockCache::disabled();
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;

        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 10);
        MouvementService::prendre(&db, 1, perceuse.id, TakeKind::Pret, 4, chrono::Duration::days(15))
            .await
            .unwrap();
        assert_eq!(StockService::available_stock(&db, &cache, perceuse.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn calcul_groupe() {
        let db = memory_db().await;
        let cache = StockCache::new(Duration::from_secs(60));
        let a = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;
        let b = insert_produit(&db, produit_fixture("Niveau", 4, AllowedMovements::Pret)).await;
        MouvementService::prendre(&db, 1, a.id, TakeKind::Pret, 3, chrono::Duration::days(15))
            .await
            .unwrap();

        let a = produit::Entity::find_by_id(a.id).one(&db).await.unwrap().unwrap();
        let disponibles = StockService::available_stock_batch(&db, &cache, &[a.clone(), b.clone()])
            .await
            .unwrap();
        assert_eq!(disponibles[&a.id], 7);
        assert_eq!(disponibles[&b.id], 4);
        assert_eq!(cache.get(a.id), Some(7));
    }
}
