use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;

use crate::models::enums::AlertKind;
use crate::models::{alerte, produit};
use crate::services::liste_service::ResumeValidation;

/// Reçoit les événements après commit. Une erreur ici ne remet jamais en
/// cause la validation déjà enregistrée.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn liste_validee(&self, utilisateur_id: i32, resume: &ResumeValidation) -> anyhow::Result<()>;
}

/// Notifier par défaut : écrit des alertes dans la table `alertes`
pub struct AlertNotifier {
    db: DatabaseConnection,
}

impl AlertNotifier {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for AlertNotifier {
    async fn liste_validee(&self, utilisateur_id: i32, resume: &ResumeValidation) -> anyhow::Result<()> {
        let maintenant = Utc::now();

        // 1. Confirmation pour l'utilisateur
        alerte::ActiveModel {
            utilisateur_id: Set(utilisateur_id),
            type_alerte: Set(AlertKind::ListeValidee),
            message: Set(format!(
                "Liste validée : {} mouvement(s) enregistré(s)",
                resume.mouvements_crees
            )),
            produit_id: Set(None),
            movement_id: Set(None),
            lue: Set(false),
            date_creation: Set(maintenant),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        if resume.produits_touches.is_empty() {
            return Ok(());
        }

        // 2. Produits passés sous leur seuil minimum
        let sous_le_seuil = produit::Entity::find()
            .filter(produit::Column::Id.is_in(resume.produits_touches.iter().copied()))
            .filter(produit::Column::EstTemplate.eq(false))
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|p| p.stock_actuel < p.stock_minimum);

        for produit in sous_le_seuil {
            tracing::info!(
                produit_id = produit.id,
                stock_actuel = produit.stock_actuel,
                stock_minimum = produit.stock_minimum,
                "stock bas"
            );

            alerte::ActiveModel {
                utilisateur_id: Set(utilisateur_id),
                type_alerte: Set(AlertKind::StockBas),
                message: Set(format!(
                    "Stock bas pour {} : {} {} (minimum {})",
                    produit.nom, produit.stock_actuel, produit.unite, produit.stock_minimum
                )),
                produit_id: Set(Some(produit.id)),
                movement_id: Set(None),
                lue: Set(false),
                date_creation: Set(maintenant),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
        }

        Ok(())
    }
}

pub struct NotificationService;

impl NotificationService {
    /// Lance la notification en tâche de fond, sans attendre son résultat
    pub fn dispatch(notifier: Arc<dyn Notifier>, utilisateur_id: i32, resume: ResumeValidation) {
        tokio::spawn(async move {
            if let Err(e) = notifier.liste_validee(utilisateur_id, &resume).await {
                tracing::warn!(utilisateur_id, error = %e, "notification de validation échouée");
            }
        });
    }

    /// GET /api/alerts/{userId}
    pub async fn alertes_utilisateur<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
        non_lues_seulement: bool,
    ) -> Result<Vec<alerte::Model>, DbErr> {
        let mut requete = alerte::Entity::find().filter(alerte::Column::UtilisateurId.eq(utilisateur_id));
        if non_lues_seulement {
            requete = requete.filter(alerte::Column::Lue.eq(false));
        }

        requete
            .order_by_desc(alerte::Column::DateCreation)
            .order_by_desc(alerte::Column::Id)
            .all(db)
            .await
    }

    /// POST /api/alerts/{id}/lue
    pub async fn marquer_lue<C: ConnectionTrait>(db: &C, alerte_id: i32) -> Result<Option<alerte::Model>, DbErr> {
        let Some(alerte) = alerte::Entity::find_by_id(alerte_id).one(db).await? else {
            return Ok(None);
        };

        if alerte.lue {
            return Ok(Some(alerte));
        }

        let mut alerte: alerte::ActiveModel = alerte.into();
        alerte.lue = Set(true);
        Ok(Some(alerte.update(db).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::AllowedMovements;
    use crate::test_support::{insert_produit, memory_db, produit_fixture};

    fn resume(produits: Vec<i32>) -> ResumeValidation {
        ResumeValidation {
            utilisateur_id: 3,
            mouvements_crees: 2,
            resultats: Vec::new(),
            produits_touches: produits,
        }
    }

    #[tokio::test]
    async fn alerte_de_validation_et_stock_bas() {
        let db = memory_db().await;
        let mut vis = produit_fixture("Vis 4x40", 2, AllowedMovements::Consommation);
        vis.stock_minimum = Set(5);
        let vis = insert_produit(&db, vis).await;
        let perceuse = insert_produit(&db, produit_fixture("Perceuse", 10, AllowedMovements::LesDeux)).await;

        let notifier = AlertNotifier::new(db.clone());
        notifier
            .liste_validee(3, &resume(vec![vis.id, perceuse.id]))
            .await
            .unwrap();

        let alertes = NotificationService::alertes_utilisateur(&db, 3, false).await.unwrap();
        assert_eq!(alertes.len(), 2);
        assert!(alertes.iter().any(|a| a.type_alerte == AlertKind::ListeValidee));
        let stock_bas: Vec<_> = alertes.iter().filter(|a| a.type_alerte == AlertKind::StockBas).collect();
        assert_eq!(stock_bas.len(), 1);
        assert_eq!(stock_bas[0].produit_id, Some(vis.id));
    }

    #[tokio::test]
    async fn marquer_lue() {
        let db = memory_db().await;
        AlertNotifier::new(db.clone()).liste_validee(3, &resume(vec![])).await.unwrap();

        let alerte = NotificationService::alertes_utilisateur(&db, 3, true).await.unwrap().remove(0);
        let lue = NotificationService::marquer_lue(&db, alerte.id).await.unwrap().unwrap();
        assert!(lue.lue);

        assert!(NotificationService::alertes_utilisateur(&db, 3, true).await.unwrap().is_empty());
        assert!(NotificationService::marquer_lue(&db, 999).await.unwrap().is_none());
    }
}
