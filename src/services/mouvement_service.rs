use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::*;

use crate::error::{StockError, StockResult};
use crate::models::dto::{BorrowRequest, DepositRequest, ReturnRequest};
use crate::models::enums::{MovementKind, MovementStatus, ProductStatus, TakeKind};
use crate::models::{liste, liste_item, mouvement, produit};
use crate::services::stock_service::StockService;
use crate::services::variant_service::{Dimensions, VariantService};
use crate::state::AppState;

pub struct MouvementService;

#[derive(Debug, Clone)]
pub struct ResultatPrise {
    pub produit: produit::Model,
    pub mouvement: mouvement::Model,
}

#[derive(Debug, Clone)]
pub struct ResultatRetour {
    /// Le prêt d'origine après mise à jour (clos ou réduit)
    pub pret: mouvement::Model,
    /// Ligne "retour" insérée lors d'un retour partiel
    pub retour: Option<mouvement::Model>,
    pub produit: produit::Model,
}

impl ResultatRetour {
    pub fn est_complet(&self) -> bool {
        self.pret.statut == MovementStatus::Termine
    }
}

#[derive(Debug, Clone)]
pub struct ResultatDepot {
    pub produit: produit::Model,
    pub mouvement: mouvement::Model,
    pub variante_creee: bool,
}

impl MouvementService {
    // ------------------------------------------------------------------------
    // Verrous
    // ------------------------------------------------------------------------
    //
    // Première instruction de chaque transaction d'écriture : verrou sur les
    // lignes produits concernées.
    //   - PostgreSQL : SELECT ... ORDER BY id FOR UPDATE, toujours dans l'ordre
    //     des ids pour que deux listes qui se chevauchent ne s'interbloquent pas
    //   - SQLite : UPDATE neutre, qui prend le verrou d'écriture de la base
    // Les lectures qui suivent voient donc l'état validé le plus récent.

    /// Requête de verrouillage PostgreSQL, triée par id
    pub(crate) fn requete_verrou(condition: Condition) -> Select<produit::Entity> {
        produit::Entity::find()
            .select_only()
            .column(produit::Column::Id)
            .filter(condition)
            .order_by_asc(produit::Column::Id)
            .lock_exclusive()
    }

    async fn verrouiller<C: ConnectionTrait>(db: &C, condition: Condition) -> Result<(), DbErr> {
        match db.get_database_backend() {
            DbBackend::Postgres | DbBackend::MySql => {
                Self::requete_verrou(condition).into_tuple::<i32>().all(db).await?;
            }
            DbBackend::Sqlite => {
                produit::Entity::update_many()
                    .col_expr(produit::Column::Id, Expr::col(produit::Column::Id).into())
                    .filter(condition)
                    .exec(db)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn verrouiller_produits<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<(), DbErr> {
        if ids.is_empty() {
            return Ok(());
        }

        Self::verrouiller(db, Condition::all().add(produit::Column::Id.is_in(ids.iter().copied()))).await
    }

    /// Verrouille le produit d'un prêt sans le lire d'abord
    pub async fn verrouiller_produit_du_mouvement<C: ConnectionTrait>(
        db: &C,
        movement_id: i32,
    ) -> Result<(), DbErr> {
        let produit_du_mouvement = Query::select()
            .column(mouvement::Column::ProduitId)
            .from(mouvement::Entity)
            .and_where(mouvement::Column::Id.eq(movement_id))
            .to_owned();

        Self::verrouiller(db, Condition::all().add(produit::Column::Id.in_subquery(produit_du_mouvement))).await
    }

    /// Verrouille tous les produits qu'une liste peut toucher (prises, dépôts
    /// et produits des prêts rendus) en une seule instruction
    /// Les variantes résolues au dépôt sont verrouillées plus tard, à l'écriture
    pub async fn verrouiller_produits_de_liste<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
    ) -> Result<(), DbErr> {
        let listes = Query::select()
            .column(liste::Column::Id)
            .from(liste::Entity)
            .and_where(liste::Column::UtilisateurId.eq(utilisateur_id))
            .to_owned();

        let produits_des_items = Query::select()
            .column(liste_item::Column::ProduitId)
            .from(liste_item::Entity)
            .and_where(liste_item::Column::ListeId.in_subquery(listes.clone()))
            .and_where(liste_item::Column::ProduitId.is_not_null())
            .to_owned();

        let mouvements_des_items = Query::select()
            .column(liste_item::Column::MovementId)
            .from(liste_item::Entity)
            .and_where(liste_item::Column::ListeId.in_subquery(listes))
            .and_where(liste_item::Column::MovementId.is_not_null())
            .to_owned();

        let produits_des_prets = Query::select()
            .column(mouvement::Column::ProduitId)
            .from(mouvement::Entity)
            .and_where(mouvement::Column::Id.in_subquery(mouvements_des_items))
            .to_owned();

        Self::verrouiller(
            db,
            Condition::any()
                .add(produit::Column::Id.in_subquery(produits_des_items))
                .add(produit::Column::Id.in_subquery(produits_des_prets)),
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Règles statiques (sans écriture)
    // ------------------------------------------------------------------------

    pub async fn charger_produit<C: ConnectionTrait>(db: &C, produit_id: i32) -> StockResult<produit::Model> {
        produit::Entity::find_by_id(produit_id)
            .one(db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Produit {} introuvable", produit_id)))
    }

    /// Un produit peut-il être pris avec ce sous-type ?
    pub fn verifier_produit_prenable(produit: &produit::Model, prise: TakeKind) -> StockResult<()> {
        if produit.est_template {
            return Err(StockError::invalid_state(format!(
                "{} est un modèle : choisissez une variante concrète",
                produit.nom
            )));
        }

        if !produit.actif {
            return Err(StockError::invalid_state(format!("{} est inactif", produit.nom)));
        }

        if produit.statut != ProductStatus::Valide {
            return Err(StockError::invalid_state(format!(
                "{} est en attente de validation",
                produit.nom
            )));
        }

        if !produit.types_mouvements_autorises.permet(prise) {
            return Err(StockError::invalid_state(format!(
                "{} n'autorise pas le mouvement {}",
                produit.nom,
                match prise {
                    TakeKind::Pret => "prêt",
                    TakeKind::Consommation => "consommation",
                }
            )));
        }

        Ok(())
    }

    /// Un prêt existe, est bien un prêt et est encore en cours
    pub async fn charger_pret_actif<C: ConnectionTrait>(db: &C, movement_id: i32) -> StockResult<mouvement::Model> {
        let pret = mouvement::Entity::find_by_id(movement_id)
            .one(db)
            .await?
            .ok_or_else(|| StockError::not_found(format!("Mouvement {} introuvable", movement_id)))?;

        if pret.type_mouvement != MovementKind::Pret {
            return Err(StockError::invalid_state(format!(
                "Le mouvement {} n'est pas un prêt",
                movement_id
            )));
        }

        if !pret.est_pret_actif() {
            return Err(StockError::invalid_state(format!(
                "Le prêt {} est déjà clos",
                movement_id
            )));
        }

        Ok(pret)
    }

    /// rendu + perdu doit être ≥ 1 et ne jamais dépasser ce qui reste dehors
    pub fn verifier_retour(pret: &mouvement::Model, quantite: i32, quantite_perdue: i32) -> StockResult<()> {
        if quantite < 0 || quantite_perdue < 0 {
            return Err(StockError::validation("Les quantités rendues et perdues doivent être positives"));
        }

        let total = Self::total_retour(quantite, quantite_perdue)?;
        if total == 0 {
            return Err(StockError::validation("Rien à rendre : quantité rendue et perdue nulles"));
        }

        if total > pret.quantite {
            return Err(StockError::validation(format!(
                "Retour de {} (dont {} perdu(s)) supérieur à la quantité en prêt ({})",
                total, quantite_perdue, pret.quantite
            )));
        }

        Ok(())
    }

    fn total_retour(quantite: i32, quantite_perdue: i32) -> StockResult<i32> {
        quantite
            .checked_add(quantite_perdue)
            .ok_or_else(|| StockError::validation("Quantités rendues et perdues hors limites"))
    }

    // ------------------------------------------------------------------------
    // Application (à appeler dans une transaction)
    // ------------------------------------------------------------------------

    /// Prise : prêt en cours (retour prévu) ou consommation immédiate
    /// Le disponible est relu sur la connexion fournie, jamais depuis le cache
    pub async fn prendre<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
        produit_id: i32,
        prise: TakeKind,
        quantite: i32,
        duree_pret: chrono::Duration,
    ) -> StockResult<ResultatPrise> {
        if quantite < 1 {
            return Err(StockError::validation("La quantité prise doit être d'au moins 1"));
        }

        Self::verrouiller_produits(db, &[produit_id]).await?;
        let produit = Self::charger_produit(db, produit_id).await?;
        Self::verifier_produit_prenable(&produit, prise)?;

        let disponible = StockService::available_for(db, &produit).await?;
        if disponible < quantite {
            return Err(StockError::InsufficientStock {
                produit: produit.nom.clone(),
                disponible: disponible.max(0),
                demande: quantite,
            });
        }

        let maintenant = Utc::now();
        let (statut, date_retour_prevu) = match prise {
            TakeKind::Pret => (MovementStatus::EnCours, Some(maintenant + duree_pret)),
            TakeKind::Consommation => (MovementStatus::Termine, None),
        };

        let mouvement = mouvement::ActiveModel {
            date: Set(maintenant),
            utilisateur_id: Set(utilisateur_id),
            produit_id: Set(produit.id),
            quantite: Set(quantite),
            type_mouvement: Set(prise.into()),
            statut: Set(statut),
            date_retour_prevu: Set(date_retour_prevu),
            date_retour_effectif: Set(None),
            quantite_perdue: Set(None),
            mouvement_origine_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let produit = match prise {
            TakeKind::Pret => produit,
            TakeKind::Consommation => Self::appliquer_delta_stock(db, produit.id, -quantite).await?,
        };

        Ok(ResultatPrise { produit, mouvement })
    }

    /// Retour total (clôture du prêt) ou partiel (prêt réduit + ligne retour)
    /// Les pertes sortent du stock physique
    pub async fn rendre<C: ConnectionTrait>(
        db: &C,
        movement_id: i32,
        quantite: i32,
        quantite_perdue: i32,
    ) -> StockResult<ResultatRetour> {
        Self::verrouiller_produit_du_mouvement(db, movement_id).await?;
        let pret = Self::charger_pret_actif(db, movement_id).await?;
        Self::verifier_retour(&pret, quantite, quantite_perdue)?;

        let maintenant = Utc::now();
        let total = Self::total_retour(quantite, quantite_perdue)?;
        let produit_id = pret.produit_id;
        let utilisateur_id = pret.utilisateur_id;
        let restant = pret
            .quantite
            .checked_sub(total)
            .filter(|restant| *restant >= 0)
            .ok_or_else(|| StockError::validation("Retour supérieur à la quantité en prêt"))?;

        let mut pret_maj: mouvement::ActiveModel = pret.into();
        let (pret, retour) = if restant == 0 {
            pret_maj.statut = Set(MovementStatus::Termine);
            pret_maj.date_retour_effectif = Set(Some(maintenant));
            pret_maj.quantite_perdue = Set(Some(quantite_perdue));
            (pret_maj.update(db).await?, None)
        } else {
            pret_maj.quantite = Set(restant);
            let pret = pret_maj.update(db).await?;

            let retour = mouvement::ActiveModel {
                date: Set(maintenant),
                utilisateur_id: Set(utilisateur_id),
                produit_id: Set(produit_id),
                quantite: Set(quantite),
                type_mouvement: Set(MovementKind::Retour),
                statut: Set(MovementStatus::Termine),
                date_retour_prevu: Set(None),
                date_retour_effectif: Set(Some(maintenant)),
                quantite_perdue: Set(Some(quantite_perdue)),
                mouvement_origine_id: Set(Some(pret.id)),
                ..Default::default()
            }
            .insert(db)
            .await?;

            (pret, Some(retour))
        };

        let produit = if quantite_perdue > 0 {
            Self::appliquer_delta_stock(db, produit_id, -quantite_perdue).await?
        } else {
            Self::charger_produit(db, produit_id).await?
        };

        Ok(ResultatRetour { pret, retour, produit })
    }

    /// Dépôt : sur un modèle, la variante concrète est résolue (ou créée)
    pub async fn deposer<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
        produit_id: i32,
        quantite: i32,
        dimensions: &Dimensions,
    ) -> StockResult<ResultatDepot> {
        if quantite < 1 {
            return Err(StockError::validation("La quantité déposée doit être d'au moins 1"));
        }

        let produit = Self::charger_produit(db, produit_id).await?;

        let (cible, variante_creee) = if produit.est_template {
            VariantService::resolve_variant(db, &produit, dimensions, utilisateur_id).await?
        } else {
            if !produit.actif && !produit.est_variante_dimensionnee() {
                return Err(StockError::invalid_state(format!("{} est inactif", produit.nom)));
            }
            (produit, false)
        };

        let produit = Self::appliquer_delta_stock(db, cible.id, quantite).await?;

        let mouvement = mouvement::ActiveModel {
            date: Set(Utc::now()),
            utilisateur_id: Set(utilisateur_id),
            produit_id: Set(produit.id),
            quantite: Set(quantite),
            type_mouvement: Set(MovementKind::Depot),
            statut: Set(MovementStatus::Termine),
            date_retour_prevu: Set(None),
            date_retour_effectif: Set(None),
            quantite_perdue: Set(None),
            mouvement_origine_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(ResultatDepot { produit, mouvement, variante_creee })
    }

    /// Applique un delta au stock physique, plancher à 0
    /// La ligne est verrouillée puis relue : le delta part toujours du stock
    /// validé le plus récent, même pour une variante résolue en cours de route
    /// Variante dimensionnée : désactivée quand une sortie l'amène à 0,
    /// réactivée par toute entrée
    async fn appliquer_delta_stock<C: ConnectionTrait>(
        db: &C,
        produit_id: i32,
        delta: i32,
    ) -> StockResult<produit::Model> {
        Self::verrouiller_produits(db, &[produit_id]).await?;
        let produit = Self::charger_produit(db, produit_id).await?;

        let brut = produit.stock_actuel.checked_add(delta).ok_or_else(|| {
            StockError::validation(format!(
                "Stock de {} hors limites après un mouvement de {}",
                produit.nom, delta
            ))
        })?;
        if brut < 0 {
            tracing::warn!(
                produit_id = produit.id,
                stock_actuel = produit.stock_actuel,
                delta,
                "sortie supérieure au stock physique, stock ramené à 0"
            );
        }
        let nouveau_stock = brut.max(0);

        let actif = if !produit.est_variante_dimensionnee() {
            produit.actif
        } else if delta < 0 && nouveau_stock == 0 {
            false
        } else if delta > 0 {
            true
        } else {
            produit.actif
        };

        if actif != produit.actif {
            tracing::info!(produit_id = produit.id, actif, "variante {}", if actif { "réactivée" } else { "épuisée, désactivée" });
        }

        let mut produit_maj: produit::ActiveModel = produit.into();
        produit_maj.stock_actuel = Set(nouveau_stock);
        produit_maj.actif = Set(actif);
        Ok(produit_maj.update(db).await?)
    }

    // ------------------------------------------------------------------------
    // Actions unitaires (hors liste) : une transaction chacune
    // ------------------------------------------------------------------------

    /// POST /api/movements/borrow
    pub async fn borrow(state: &AppState, request: BorrowRequest) -> StockResult<ResultatPrise> {
        let txn = state.db.begin().await?;
        Self::verrouiller_produits(&txn, &[request.produit_id]).await?;

        let resultat = Self::prendre(
            &txn,
            request.user_id,
            request.produit_id,
            request.type_mouvement,
            request.quantite,
            state.config.duree_pret(),
        )
        .await?;

        txn.commit().await?;
        state.cache.invalidate(resultat.produit.id);

        tracing::info!(
            movement_id = resultat.mouvement.id,
            produit_id = resultat.produit.id,
            quantite = request.quantite,
            "prise enregistrée"
        );
        Ok(resultat)
    }

    /// POST /api/movements/return
    pub async fn return_movement(state: &AppState, request: ReturnRequest) -> StockResult<ResultatRetour> {
        let txn = state.db.begin().await?;
        Self::verrouiller_produit_du_mouvement(&txn, request.movement_id).await?;

        let resultat = Self::rendre(
            &txn,
            request.movement_id,
            request.quantite,
            request.quantite_perdue.unwrap_or(0),
        )
        .await?;

        txn.commit().await?;
        state.cache.invalidate(resultat.produit.id);

        tracing::info!(
            movement_id = request.movement_id,
            complet = resultat.est_complet(),
            "retour enregistré"
        );
        Ok(resultat)
    }

    /// POST /api/movements/deposit
    pub async fn deposit(state: &AppState, request: DepositRequest) -> StockResult<ResultatDepot> {
        let txn = state.db.begin().await?;
        Self::verrouiller_produits(&txn, &[request.produit_id]).await?;

        let dimensions = Dimensions {
            longueur: request.longueur,
            largeur: request.largeur,
            couleur: request.couleur.clone(),
        };
        let resultat = Self::deposer(&txn, request.user_id, request.produit_id, request.quantite, &dimensions).await?;

        txn.commit().await?;
        state.cache.invalidate(resultat.produit.id);

        tracing::info!(
            movement_id = resultat.mouvement.id,
            produit_id = resultat.produit.id,
            variante_creee = resultat.variante_creee,
            "dépôt enregistré"
        );
        Ok(resultat)
    }

    /// Prêts encore en cours d'un utilisateur, avec le nom du produit
    pub async fn prets_actifs<C: ConnectionTrait>(
        db: &C,
        utilisateur_id: i32,
    ) -> StockResult<Vec<(mouvement::Model, Option<produit::Model>)>> {
        let prets = mouvement::Entity::find()
            .filter(mouvement::Column::UtilisateurId.eq(utilisateur_id))
            .filter(mouvement::Column::TypeMouvement.eq(MovementKind::Pret))
            .filter(mouvement::Column::Statut.eq(MovementStatus::EnCours))
            .order_by_asc(mouvement::Column::Date)
            .find_also_related(produit::Entity)
            .all(db)
            .await?;
        Ok(prets)
    }
}
