//! Rejeu de la file hors-ligne vers le serveur.
//!
//! Les actions partent une par une, dans l'ordre d'insertion. Un échec
//! transitoire est retenté après chaque délai de la politique ; une fois les
//! délais épuisés, ou au premier refus définitif, l'action passe en échec et
//! attend une relance manuelle (`flush_single`).

use std::time::Duration;

use uuid::Uuid;

use super::client::{ListeClient, SubmitError};
use super::queue::{OfflineQueue, QueueError};
use crate::models::dto::AddItemRequest;

/// Délais entre deux tentatives ; leur nombre fixe le nombre de reprises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delais: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delais: vec![Duration::from_secs(1), Duration::from_secs(2)],
        }
    }
}

impl RetryPolicy {
    pub fn sans_delai(reprises: usize) -> Self {
        Self {
            delais: vec![Duration::ZERO; reprises],
        }
    }
}

/// Résultat d'un envoi avec reprises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soumission {
    pub tentatives: u32,
    pub resultat: Result<(), SubmitError>,
}

pub async fn submit_with_retry<C>(client: &C, request: &AddItemRequest, policy: &RetryPolicy) -> Soumission
where
    C: ListeClient + ?Sized,
{
    let mut delais = policy.delais.iter();
    let mut tentatives = 0;

    loop {
        tentatives += 1;
        match client.add_item(request).await {
            Ok(()) => {
                return Soumission {
                    tentatives,
                    resultat: Ok(()),
                };
            }
            Err(SubmitError::Transient(raison)) => match delais.next() {
                Some(delai) => {
                    tracing::debug!(tentatives, ?delai, %raison, "échec transitoire, nouvelle tentative");
                    tokio::time::sleep(*delai).await;
                }
                None => {
                    return Soumission {
                        tentatives,
                        resultat: Err(SubmitError::Transient(raison)),
                    };
                }
            },
            Err(definitif) => {
                return Soumission {
                    tentatives,
                    resultat: Err(definitif),
                };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchecAction {
    pub action_id: Uuid,
    pub tentatives: u32,
    pub raison: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub envoyees: usize,
    pub echecs: Vec<EchecAction>,
}

impl FlushReport {
    pub fn echouees(&self) -> usize {
        self.echecs.len()
    }
}

/// Avancement transmis à l'interface pendant un flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub traitees: usize,
    pub total: usize,
}

pub struct OfflineSync<C: ListeClient> {
    queue: OfflineQueue,
    client: C,
    policy: RetryPolicy,
}

impl<C: ListeClient> OfflineSync<C> {
    pub fn new(queue: OfflineQueue, client: C) -> Self {
        Self::with_policy(queue, client, RetryPolicy::default())
    }

    pub fn with_policy(queue: OfflineQueue, client: C, policy: RetryPolicy) -> Self {
        Self { queue, client, policy }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Envoie toutes les actions en attente, séquentiellement
    pub async fn flush<F>(&self, mut on_progress: F) -> Result<FlushReport, QueueError>
    where
        F: FnMut(Progression),
    {
        let actions = self.queue.pending().await?;
        let total = actions.len();
        let mut report = FlushReport::default();

        tracing::info!(total, "synchronisation de la file hors-ligne");

        for (index, action) in actions.into_iter().enumerate() {
            match self.envoyer(action.id, &action).await? {
                Ok(()) => report.envoyees += 1,
                Err(echec) => report.echecs.push(echec),
            }

            on_progress(Progression {
                traitees: index + 1,
                total,
            });
        }

        tracing::info!(
            envoyees = report.envoyees,
            echouees = report.echouees(),
            "synchronisation terminée"
        );
        Ok(report)
    }

    /// Relance une seule action, en attente ou déjà en échec
    pub async fn flush_single(&self, id: Uuid) -> Result<Result<(), EchecAction>, QueueError> {
        let action = self.queue.get(id).await?.ok_or(QueueError::NotFound(id))?;
        self.envoyer(id, &action).await
    }

    async fn envoyer(
        &self,
        id: Uuid,
        action: &super::action::Model,
    ) -> Result<Result<(), EchecAction>, QueueError> {
        let request = match action.requete() {
            Ok(request) => request,
            Err(e) => {
                let raison = format!("charge utile illisible : {e}");
                self.queue.mark_failed(id, 0, &raison).await?;
                return Ok(Err(EchecAction {
                    action_id: id,
                    tentatives: 0,
                    raison,
                }));
            }
        };

        let soumission = submit_with_retry(&self.client, &request, &self.policy).await;
        match soumission.resultat {
            Ok(()) => {
                self.queue.remove(id).await?;
                Ok(Ok(()))
            }
            Err(e) => {
                let raison = e.to_string();
                tracing::warn!(
                    action_id = %id,
                    tentatives = soumission.tentatives,
                    transitoire = e.est_transitoire(),
                    %raison,
                    "action hors-ligne en échec"
                );
                self.queue.mark_failed(id, soumission.tentatives, &raison).await?;
                Ok(Err(EchecAction {
                    action_id: id,
                    tentatives: soumission.tentatives,
                    raison,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::offline::action::PendingStatus;
    use crate::offline::queue::tests::{queue_memoire, requete};

    /// Client scripté : rejoue les réponses prévues puis répond `defaut`
    struct ClientScripte {
        reponses: Mutex<VecDeque<Result<(), SubmitError>>>,
        defaut: Result<(), SubmitError>,
        appels: Mutex<Vec<(tokio::time::Instant, AddItemRequest)>>,
    }

    impl ClientScripte {
        fn new(reponses: Vec<Result<(), SubmitError>>, defaut: Result<(), SubmitError>) -> Self {
            Self {
                reponses: Mutex::new(reponses.into()),
                defaut,
                appels: Mutex::new(Vec::new()),
            }
        }

        fn toujours(reponse: Result<(), SubmitError>) -> Self {
            Self::new(Vec::new(), reponse)
        }

        fn nb_appels(&self) -> usize {
            self.appels.lock().len()
        }
    }

    #[async_trait]
    impl ListeClient for ClientScripte {
        async fn add_item(&self, request: &AddItemRequest) -> Result<(), SubmitError> {
            self.appels
                .lock()
                .push((tokio::time::Instant::now(), request.clone()));
            let prevue = self.reponses.lock().pop_front();
            prevue.unwrap_or_else(|| self.defaut.clone())
        }
    }

    fn indisponible() -> SubmitError {
        SubmitError::Transient("réponse HTTP 503 Service Unavailable".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn delais_de_une_puis_deux_secondes() {
        let client = ClientScripte::toujours(Err(indisponible()));

        let soumission = submit_with_retry(&client, &requete(1, 1), &RetryPolicy::default()).await;

        assert_eq!(soumission.tentatives, 3);
        assert!(matches!(soumission.resultat, Err(SubmitError::Transient(_))));

        let appels = client.appels.lock();
        let premier_ecart = appels[1].0 - appels[0].0;
        let second_ecart = appels[2].0 - appels[1].0;
        assert!(premier_ecart >= Duration::from_secs(1) && premier_ecart < Duration::from_millis(1100));
        assert!(second_ecart >= Duration::from_secs(2) && second_ecart < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn reussite_apres_une_reprise() {
        let client = ClientScripte::new(vec![Err(indisponible())], Ok(()));

        let soumission = submit_with_retry(&client, &requete(1, 1), &RetryPolicy::default()).await;
        assert_eq!(soumission.tentatives, 2);
        assert_eq!(soumission.resultat, Ok(()));
    }

    #[tokio::test]
    async fn refus_definitif_une_seule_tentative() {
        let (queue, _db) = queue_memoire().await;
        let action = queue.enqueue(&requete(1, 1)).await.unwrap();
        let client = ClientScripte::toujours(Err(SubmitError::Terminal(
            "Stock insuffisant pour Perceuse : 0 disponible(s), 1 demandé(s)".to_string(),
        )));
        let sync = OfflineSync::with_policy(queue, client, RetryPolicy::sans_delai(2));

        let report = sync.flush(|_| {}).await.unwrap();

        assert_eq!(report.envoyees, 0);
        assert_eq!(report.echecs.len(), 1);
        assert_eq!(report.echecs[0].tentatives, 1);
        assert_eq!(sync.client.nb_appels(), 1);

        let echouee = sync.queue().get(action.id).await.unwrap().unwrap();
        assert_eq!(echouee.statut, PendingStatus::Failed);
        assert!(echouee.erreur.unwrap().contains("Stock insuffisant"));
    }

    #[tokio::test]
    async fn indisponibilite_trois_tentatives_puis_echec() {
        let (queue, _db) = queue_memoire().await;
        let action = queue.enqueue(&requete(1, 1)).await.unwrap();
        let sync = OfflineSync::with_policy(
            queue,
            ClientScripte::toujours(Err(indisponible())),
            RetryPolicy::sans_delai(2),
        );

        let report = sync.flush(|_| {}).await.unwrap();

        assert_eq!(report.echecs[0].tentatives, 3);
        assert_eq!(sync.client.nb_appels(), 3);
        let echouee = sync.queue().get(action.id).await.unwrap().unwrap();
        assert_eq!(echouee.statut, PendingStatus::Failed);
        assert_eq!(echouee.tentatives, 3);
        assert!(echouee.erreur.unwrap().starts_with("synchronisation requise"));

        // déjà en échec : un nouveau flush ne la retente pas
        let report = sync.flush(|_| {}).await.unwrap();
        assert_eq!(report, FlushReport::default());
        assert_eq!(sync.client.nb_appels(), 3);
    }

    #[tokio::test]
    async fn flush_dans_l_ordre_avec_progression() {
        let (queue, _db) = queue_memoire().await;
        queue.enqueue(&requete(1, 10)).await.unwrap();
        queue.enqueue(&requete(1, 20)).await.unwrap();
        queue.enqueue(&requete(2, 30)).await.unwrap();
        let sync = OfflineSync::with_policy(queue, ClientScripte::toujours(Ok(())), RetryPolicy::sans_delai(2));

        let mut progression = Vec::new();
        let report = sync.flush(|p| progression.push(p)).await.unwrap();

        assert_eq!(report.envoyees, 3);
        assert!(sync.queue().is_empty().await.unwrap());
        let produits: Vec<Option<i32>> = sync
            .client
            .appels
            .lock()
            .iter()
            .map(|(_, r)| r.item.produit_id)
            .collect();
        assert_eq!(produits, vec![Some(10), Some(20), Some(30)]);
        assert_eq!(progression.last(), Some(&Progression { traitees: 3, total: 3 }));
    }

    #[tokio::test]
    async fn relance_manuelle_d_une_action_en_echec() {
        let (queue, _db) = queue_memoire().await;
        let action = queue.enqueue(&requete(1, 1)).await.unwrap();
        let client = ClientScripte::new(vec![Err(SubmitError::Terminal("Produit inactif".to_string()))], Ok(()));
        let sync = OfflineSync::with_policy(queue, client, RetryPolicy::sans_delai(2));

        sync.flush(|_| {}).await.unwrap();
        assert_eq!(sync.queue().pending_count().await.unwrap(), 0);

        let resultat = sync.flush_single(action.id).await.unwrap();
        assert_eq!(resultat, Ok(()));
        assert!(sync.queue().get(action.id).await.unwrap().is_none());

        assert!(matches!(
            sync.flush_single(action.id).await.unwrap_err(),
            QueueError::NotFound(_)
        ));
    }
}
