use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::*;
use tracing::Instrument;
use validator::Validate;

use crate::error::{StockError, StockResult};
use crate::models::dto::{AddItemRequest, ListeDetail, NouvelItem, ResultatItem};
use crate::models::enums::{ListActionKind, TakeKind};
use crate::models::{liste, liste_item};
use crate::services::mouvement_service::MouvementService;
use crate::services::notification_service::NotificationService;
use crate::services::stock_service::StockService;
use crate::services::variant_service::{Dimensions, VariantService};
use crate::state::AppState;

pub struct ListeService;

/// Bilan d'une validation, transmis au notifier après commit
#[derive(Debug, Clone)]
pub struct ResumeValidation {
    pub utilisateur_id: i32,
    /// Lignes de mouvement insérées (un retour complet met à jour le prêt sans en créer)
    pub mouvements_crees: usize,
    pub resultats: Vec<ResultatItem>,
    pub produits_touches: Vec<i32>,
}

/// Action d'un item, une fois ses champs obligatoires vérifiés
#[derive(Debug, Clone)]
enum Action {
    Prendre {
        produit_id: i32,
        prise: TakeKind,
        quantite: i32,
    },
    Rendre {
        movement_id: i32,
        quantite: i32,
        quantite_perdue: i32,
    },
    Deposer {
        produit_id: i32,
        quantite: i32,
        dimensions: Dimensions,
    },
}

impl Action {
    fn depuis_nouvel_item(item: &NouvelItem) -> StockResult<Self> {
        Self::construire(
            item.type_action,
            item.produit_id,
            item.type_mouvement,
            item.movement_id,
            item.quantite,
            item.quantite_perdue,
            Dimensions {
                longueur: item.longueur,
                largeur: item.largeur,
                couleur: item.couleur.clone(),
            },
        )
    }

    fn depuis_item(item: &liste_item::Model) -> StockResult<Self> {
        Self::construire(
            item.type_action,
            item.produit_id,
            item.type_mouvement,
            item.movement_id,
            item.quantite,
            item.quantite_perdue,
            Dimensions {
                longueur: item.longueur,
                largeur: item.largeur,
                couleur: item.couleur.clone(),
            },
        )
    }

    fn construire(
        type_action: ListActionKind,
        produit_id: Option<i32>,
        type_mouvement: Option<TakeKind>,
        movement_id: Option<i32>,
        quantite: i32,
        quantite_perdue: Option<i32>,
        dimensions: Dimensions,
    ) -> StockResult<Self> {
        match type_action {
            ListActionKind::Prendre => {
                let produit_id = produit_id.ok_or_else(|| StockError::validation("produitId requis pour prendre"))?;
                let prise = type_mouvement
                    .ok_or_else(|| StockError::validation("typeMouvement requis pour prendre (pret ou consommation)"))?;
                if quantite < 1 {
                    return Err(StockError::validation("La quantité prise doit être d'au moins 1"));
                }
                Ok(Action::Prendre { produit_id, prise, quantite })
            }
            ListActionKind::Rendre => {
                let movement_id = movement_id.ok_or_else(|| StockError::validation("movementId requis pour rendre"))?;
                Ok(Action::Rendre {
                    movement_id,
                    quantite,
                    quantite_perdue: quantite_perdue.unwrap_or(0),
                })
            }
            ListActionKind::Deposer => {
                let produit_id = produit_id.ok_or_else(|| StockError::validation("produitId requis pour déposer"))?;
                if quantite < 1 {
                    return Err(StockError::validation("La quantité déposée doit être d'au moins 1"));
                }
                Ok(Action::Deposer { produit_id, quantite, dimensions })
            }
        }
    }
}

impl ListeService {
    /// Liste ouverte de l'utilisateur, créée au premier ajout
    pub async fn get_or_create_liste<C: ConnectionTrait>(db: &C, utilisateur_id: i32) -> Result<liste::Model, DbErr> {
        if let Some(liste) = Self::trouver_liste(db, utilisateur_id).await? {
            return Ok(liste);
        }

        let insertion = liste::ActiveModel {
            utilisateur_id: Set(utilisateur_id),
            date_creation: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match insertion {
            Ok(liste) => Ok(liste),
            // Deux ajouts simultanés : la contrainte unique a tranché, on relit
            Err(e) => match Self::trouver_liste(db, utilisateur_id).await? {
                Some(liste) => Ok(liste),
                None => Err(e),
            },
        }
    }

    async fn trouver_liste<C: ConnectionTrait>(db: &C, utilisateur_id: i32) -> Result<Option<liste::Model>, DbErr> {
        liste::Entity::find()
            .filter(liste::Column::UtilisateurId.eq(utilisateur_id))
            .one(db)
            .await
    }

    async fn items_de_liste<C: ConnectionTrait>(db: &C, liste_id: i32) -> Result<Vec<liste_item::Model>, DbErr> {
        liste_item::Entity::find()
            .filter(liste_item::Column::ListeId.eq(liste_id))
            .order_by_asc(liste_item::Column::Id)
            .all(db)
            .await
    }

    /// POST /api/liste/add
    /// Vérifications rapides à l'ajout ; tout est revérifié à la validation
    pub async fn add_item(state: &AppState, request: AddItemRequest) -> StockResult<liste_item::Model> {
        request.validate()?;

        let action = Action::depuis_nouvel_item(&request.item)?;
        Self::verifier_action(&state.db, &action).await?;

        // Indication précoce sur le disponible (valeur en cache)
        if let Action::Prendre { produit_id, quantite, .. } = &action {
            let disponible = StockService::available_stock(&state.db, &state.cache, *produit_id).await?;
            if disponible < *quantite {
                let produit = MouvementService::charger_produit(&state.db, *produit_id).await?;
                return Err(StockError::InsufficientStock {
                    produit: produit.nom,
                    disponible: disponible.max(0),
                    demande: *quantite,
                });
            }
        }

        let liste = Self::get_or_create_liste(&state.db, request.user_id).await?;
        let item = request.item;

        let cree = liste_item::ActiveModel {
            liste_id: Set(liste.id),
            type_action: Set(item.type_action),
            produit_id: Set(item.produit_id),
            type_mouvement: Set(item.type_mouvement),
            movement_id: Set(item.movement_id),
            quantite: Set(item.quantite),
            quantite_perdue: Set(item.quantite_perdue),
            longueur: Set(item.longueur),
            largeur: Set(item.largeur),
            couleur: Set(item.couleur),
            date_ajout: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&state.db)
        .await?;

        tracing::debug!(
            utilisateur_id = request.user_id,
            item_id = cree.id,
            type_action = ?cree.type_action,
            "item ajouté à la liste"
        );
        Ok(cree)
    }

    /// GET /api/liste/{userId}
    pub async fn get_liste<C: ConnectionTrait>(db: &C, utilisateur_id: i32) -> StockResult<ListeDetail> {
        let Some(liste) = Self::trouver_liste(db, utilisateur_id).await? else {
            return Ok(ListeDetail {
                liste_id: None,
                utilisateur_id,
                items: Vec::new(),
            });
        };

        let items = Self::items_de_liste(db, liste.id).await?;
        Ok(ListeDetail {
            liste_id: Some(liste.id),
            utilisateur_id,
            items,
        })
    }

    /// DELETE /api/liste/{userId}/clear
    /// Retourne le nombre d'items supprimés
    pub async fn clear<C: TransactionTrait>(db: &C, utilisateur_id: i32) -> StockResult<u64> {
        let txn = db.begin().await?;

        let Some(liste) = Self::trouver_liste(&txn, utilisateur_id).await? else {
            return Ok(0);
        };

        let supprimes = Self::supprimer_liste(&txn, liste).await?;
        txn.commit().await?;
        Ok(supprimes)
    }

    /// DELETE /api/liste/item/{itemId}
    pub async fn remove_item<C: ConnectionTrait>(db: &C, item_id: i32) -> StockResult<()> {
        let resultat = liste_item::Entity::delete_by_id(item_id).exec(db).await?;
        if resultat.rows_affected == 0 {
            return Err(StockError::not_found(format!("Item {} introuvable", item_id)));
        }
        Ok(())
    }

    // Items d'abord : les clés étrangères sont vérifiées
    async fn supprimer_liste<C: ConnectionTrait>(db: &C, liste: liste::Model) -> Result<u64, DbErr> {
        let items = liste_item::Entity::delete_many()
            .filter(liste_item::Column::ListeId.eq(liste.id))
            .exec(db)
            .await?;
        liste.delete(db).await?;
        Ok(items.rows_affected)
    }

    /// POST /api/liste/{userId}/validate
    /// Tout ou rien : une seule transaction, verrous pris en premier
    pub async fn validate_and_commit(state: &AppState, utilisateur_id: i32) -> StockResult<ResumeValidation> {
        let span = tracing::info_span!("validation_liste", utilisateur_id);

        async move {
            let resume = Self::appliquer_liste(state, utilisateur_id).await?;

            // 5. Le disponible de tous les produits touchés a pu changer
            state.cache.invalidate_all();

            tracing::info!(
                mouvements_crees = resume.mouvements_crees,
                items = resume.resultats.len(),
                "liste validée"
            );

            // 6. Notification en tâche de fond
            NotificationService::dispatch(state.notifier.clone(), utilisateur_id, resume.clone());

            Ok::<_, StockError>(resume)
        }
        .instrument(span)
        .await
    }

    async fn appliquer_liste(state: &AppState, utilisateur_id: i32) -> StockResult<ResumeValidation> {
        let txn = state.db.begin().await?;
        MouvementService::verrouiller_produits_de_liste(&txn, utilisateur_id).await?;

        // 1. Chargement de la liste
        let liste = Self::trouver_liste(&txn, utilisateur_id)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Aucune liste pour l'utilisateur {}", utilisateur_id)))?;

        let items = Self::items_de_liste(&txn, liste.id).await?;
        if items.is_empty() {
            return Err(StockError::invalid_state("La liste est vide"));
        }

        // 2. Pré-validation statique de chaque item, avant toute écriture
        let mut actions = Vec::with_capacity(items.len());
        for item in &items {
            let action = Action::depuis_item(item)?;
            Self::verifier_action(&txn, &action).await?;
            actions.push((item.id, item.type_action, action));
        }

        // 3. Application séquentielle, chaque item voit les effets des précédents
        let duree_pret = state.config.duree_pret();
        let mut resultats = Vec::with_capacity(actions.len());
        let mut mouvements_crees = 0;
        let mut produits_touches = BTreeSet::new();

        for (item_id, type_action, action) in actions {
            let (resultat, cree) =
                Self::appliquer_action(&txn, utilisateur_id, item_id, type_action, action, duree_pret).await?;
            if cree {
                mouvements_crees += 1;
            }
            produits_touches.insert(resultat.produit_id);
            resultats.push(resultat);
        }

        // 4. Suppression de la liste puis commit
        Self::supprimer_liste(&txn, liste).await?;
        txn.commit().await?;

        Ok(ResumeValidation {
            utilisateur_id,
            mouvements_crees,
            resultats,
            produits_touches: produits_touches.into_iter().collect(),
        })
    }

    /// Règles statiques d'un item (existence, statut, modèle, type autorisé,
    /// prêt actif, forme des quantités et dimensions)
    async fn verifier_action<C: ConnectionTrait>(db: &C, action: &Action) -> StockResult<()> {
        match action {
            Action::Prendre { produit_id, prise, .. } => {
                let produit = MouvementService::charger_produit(db, *produit_id).await?;
                MouvementService::verifier_produit_prenable(&produit, *prise)
            }
            Action::Rendre {
                movement_id,
                quantite,
                quantite_perdue,
            } => {
                let pret = MouvementService::charger_pret_actif(db, *movement_id).await?;
                MouvementService::verifier_retour(&pret, *quantite, *quantite_perdue)
            }
            Action::Deposer { produit_id, dimensions, .. } => {
                let produit = MouvementService::charger_produit(db, *produit_id).await?;
                if produit.est_template {
                    VariantService::normaliser(&produit, dimensions).map(|_| ())
                } else if !produit.actif && !produit.est_variante_dimensionnee() {
                    Err(StockError::invalid_state(format!("{} est inactif", produit.nom)))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Retourne le résultat de l'item et si une ligne de mouvement a été insérée
    async fn appliquer_action<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
        item_id: i32,
        type_action: ListActionKind,
        action: Action,
        duree_pret: chrono::Duration,
    ) -> StockResult<(ResultatItem, bool)> {
        match action {
            Action::Prendre { produit_id, prise, quantite } => {
                let prise_faite =
                    MouvementService::prendre(db, utilisateur_id, produit_id, prise, quantite, duree_pret).await?;
                let message = match prise {
                    TakeKind::Pret => format!("Prêt de {} {}", quantite, prise_faite.produit.nom),
                    TakeKind::Consommation => format!("Consommation de {} {}", quantite, prise_faite.produit.nom),
                };
                Ok((
                    ResultatItem {
                        item_id,
                        type_action,
                        produit_id: prise_faite.produit.id,
                        movement_id: Some(prise_faite.mouvement.id),
                        quantite,
                        message,
                    },
                    true,
                ))
            }
            Action::Rendre {
                movement_id,
                quantite,
                quantite_perdue,
            } => {
                let retour = MouvementService::rendre(db, movement_id, quantite, quantite_perdue).await?;
                let mut message = if retour.est_complet() {
                    format!("Retour complet de {}", retour.produit.nom)
                } else {
                    format!(
                        "Retour partiel de {} : {} encore en prêt",
                        retour.produit.nom, retour.pret.quantite
                    )
                };
                if quantite_perdue > 0 {
                    message.push_str(&format!(" ({} perdu(s))", quantite_perdue));
                }
                let cree = retour.retour.is_some();
                Ok((
                    ResultatItem {
                        item_id,
                        type_action,
                        produit_id: retour.produit.id,
                        movement_id: Some(retour.retour.map(|r| r.id).unwrap_or(retour.pret.id)),
                        quantite,
                        message,
                    },
                    cree,
                ))
            }
            Action::Deposer {
                produit_id,
                quantite,
                dimensions,
            } => {
                let depot = MouvementService::deposer(db, utilisateur_id, produit_id, quantite, &dimensions).await?;
                let message = if depot.variante_creee {
                    format!("Dépôt de {} {} (nouvelle variante)", quantite, depot.produit.nom)
                } else {
                    format!("Dépôt de {} {}", quantite, depot.produit.nom)
                };
                Ok((
                    ResultatItem {
                        item_id,
                        type_action,
                        produit_id: depot.produit.id,
                        movement_id: Some(depot.mouvement.id),
                        quantite,
                        message,
                    },
                    true,
                ))
            }
        }
    }
}
