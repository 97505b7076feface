//! File durable des ajouts faits hors-ligne.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use thiserror::Error;
use uuid::Uuid;

use super::action::{self, PendingStatus};
use crate::models::dto::AddItemRequest;

/// Au-delà, l'utilisateur doit se reconnecter avant d'ajouter quoi que ce soit
pub const CAPACITE_MAX: u64 = 50;
pub const AGE_MAX_JOURS: i64 = 7;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("file hors-ligne pleine : {0} actions en attente, synchronisez avant d'en ajouter")]
    CapacityExceeded(u64),

    #[error("action hors-ligne {0} introuvable")]
    NotFound(Uuid),

    #[error("stockage local : {0}")]
    Storage(#[from] DbErr),

    #[error("charge utile illisible : {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OfflineQueue {
    db: DatabaseConnection,
}

impl OfflineQueue {
    /// Ouvre (ou crée) la base locale, par ex. `sqlite://file_hors_ligne.db?mode=rwc`
    pub async fn open(url: &str) -> Result<Self, QueueError> {
        let db = Database::connect(url).await?;
        Self::from_connection(db).await
    }

    /// Chargement : table créée si besoin, actions trop anciennes abandonnées
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self, QueueError> {
        crate::db::create_table(&db, action::Entity).await?;

        let queue = Self { db };
        let purgees = queue
            .purge_older_than(chrono::Duration::days(AGE_MAX_JOURS))
            .await?;
        if purgees > 0 {
            tracing::warn!(purgees, "actions hors-ligne de plus de {} jours abandonnées", AGE_MAX_JOURS);
        }

        Ok(queue)
    }

    pub async fn enqueue(&self, request: &AddItemRequest) -> Result<action::Model, QueueError> {
        self.enqueue_at(request, Utc::now()).await
    }

    pub async fn enqueue_at(
        &self,
        request: &AddItemRequest,
        date_creation: DateTime<Utc>,
    ) -> Result<action::Model, QueueError> {
        let taille = self.len().await?;
        if taille >= CAPACITE_MAX {
            return Err(QueueError::CapacityExceeded(taille));
        }

        let derniere = action::Entity::find()
            .select_only()
            .column_as(Expr::col(action::Column::Sequence).max(), "derniere")
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?;
        let sequence = derniere.flatten().unwrap_or(0) + 1;

        let action = action::ActiveModel {
            id: Set(Uuid::new_v4()),
            utilisateur_id: Set(request.user_id),
            sequence: Set(sequence),
            payload: Set(serde_json::to_value(request)?),
            statut: Set(PendingStatus::Pending),
            tentatives: Set(0),
            erreur: Set(None),
            date_creation: Set(date_creation),
        }
        .insert(&self.db)
        .await?;

        tracing::debug!(action_id = %action.id, sequence, "action mise en file hors-ligne");
        Ok(action)
    }

    /// Retire et retourne l'action la plus ancienne
    pub async fn dequeue(&self) -> Result<Option<action::Model>, QueueError> {
        let Some(action) = action::Entity::find()
            .order_by_asc(action::Column::Sequence)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        self.remove(action.id).await?;
        Ok(Some(action))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), QueueError> {
        let resultat = action::Entity::delete_by_id(id).exec(&self.db).await?;
        if resultat.rows_affected == 0 {
            return Err(QueueError::NotFound(id));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<action::Model>, QueueError> {
        Ok(action::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Toutes les actions (en attente et en échec), dans l'ordre d'insertion
    pub async fn list(&self) -> Result<Vec<action::Model>, QueueError> {
        Ok(action::Entity::find()
            .order_by_asc(action::Column::Sequence)
            .all(&self.db)
            .await?)
    }

    pub async fn pending(&self) -> Result<Vec<action::Model>, QueueError> {
        Ok(action::Entity::find()
            .filter(action::Column::Statut.eq(PendingStatus::Pending))
            .order_by_asc(action::Column::Sequence)
            .all(&self.db)
            .await?)
    }

    /// Pastille "à synchroniser" de l'interface
    pub async fn pending_count(&self) -> Result<u64, QueueError> {
        Ok(action::Entity::find()
            .filter(action::Column::Statut.eq(PendingStatus::Pending))
            .count(&self.db)
            .await?)
    }

    pub async fn len(&self) -> Result<u64, QueueError> {
        Ok(action::Entity::find().count(&self.db).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    pub async fn purge_older_than(&self, age: chrono::Duration) -> Result<u64, QueueError> {
        let limite = Utc::now() - age;
        let resultat = action::Entity::delete_many()
            .filter(action::Column::DateCreation.lt(limite))
            .exec(&self.db)
            .await?;
        Ok(resultat.rows_affected)
    }

    pub async fn mark_failed(&self, id: Uuid, tentatives: u32, raison: &str) -> Result<action::Model, QueueError> {
        let action = self.get(id).await?.ok_or(QueueError::NotFound(id))?;

        let mut action: action::ActiveModel = action.into();
        action.statut = Set(PendingStatus::Failed);
        action.tentatives = Set(i32::try_from(tentatives).unwrap_or(i32::MAX));
        action.erreur = Set(Some(raison.to_string()));
        Ok(action.update(&self.db).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::dto::NouvelItem;
    use crate::models::enums::{ListActionKind, TakeKind};

    pub(crate) async fn queue_memoire() -> (OfflineQueue, DatabaseConnection) {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        let queue = OfflineQueue::from_connection(db.clone()).await.unwrap();
        (queue, db)
    }

    pub(crate) fn requete(user_id: i32, produit_id: i32) -> AddItemRequest {
        AddItemRequest {
            user_id,
            item: NouvelItem {
                type_action: ListActionKind::Prendre,
                produit_id: Some(produit_id),
                type_mouvement: Some(TakeKind::Pret),
                movement_id: None,
                quantite: 1,
                quantite_perdue: None,
                longueur: None,
                largeur: None,
                couleur: None,
            },
        }
    }

    #[tokio::test]
    async fn capacite_de_cinquante() {
        let (queue, _db) = queue_memoire().await;
        for i in 0..50 {
            queue.enqueue(&requete(1, i)).await.unwrap();
        }

        let err = queue.enqueue(&requete(1, 51)).await.unwrap_err();
        assert!(matches!(err, QueueError::CapacityExceeded(50)));
        assert_eq!(queue.len().await.unwrap(), 50);
        assert_eq!(queue.pending_count().await.unwrap(), 50);
    }

    #[tokio::test]
    async fn actions_trop_anciennes_purgees_au_chargement() {
        let (queue, db) = queue_memoire().await;
        queue
            .enqueue_at(&requete(1, 1), Utc::now() - chrono::Duration::days(8))
            .await
            .unwrap();
        queue
            .enqueue_at(&requete(1, 2), Utc::now() - chrono::Duration::days(6))
            .await
            .unwrap();

        let recharge = OfflineQueue::from_connection(db).await.unwrap();
        let restantes = recharge.list().await.unwrap();
        assert_eq!(restantes.len(), 1);
        assert_eq!(restantes[0].requete().unwrap(), requete(1, 2));
    }

    #[tokio::test]
    async fn dequeue_dans_l_ordre_d_insertion() {
        let (queue, _db) = queue_memoire().await;
        let maintenant = Utc::now();
        queue.enqueue_at(&requete(1, 10), maintenant).await.unwrap();
        queue.enqueue_at(&requete(1, 20), maintenant).await.unwrap();

        let premiere = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(premiere.requete().unwrap().item.produit_id, Some(10));
        let seconde = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(seconde.requete().unwrap().item.produit_id, Some(20));
        assert!(queue.dequeue().await.unwrap().is_none());
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn echec_sort_du_compteur_en_attente() {
        let (queue, _db) = queue_memoire().await;
        let action = queue.enqueue(&requete(1, 1)).await.unwrap();

        let echouee = queue.mark_failed(action.id, 1, "Produit inactif").await.unwrap();
        assert_eq!(echouee.statut, PendingStatus::Failed);
        assert_eq!(echouee.erreur.as_deref(), Some("Produit inactif"));
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(queue.len().await.unwrap(), 1);

        queue.remove(action.id).await.unwrap();
        assert!(matches!(
            queue.remove(action.id).await.unwrap_err(),
            QueueError::NotFound(_)
        ));
    }
}
