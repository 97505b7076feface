use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::error::StockError;
use crate::models::dto::{BorrowRequest, DepositRequest, PretActifResponse, ReturnRequest};
use crate::services::mouvement_service::MouvementService;
use crate::state::AppState;

/// POST /api/movements/borrow - Prêt ou consommation immédiate
#[post("/borrow")]
pub async fn borrow(
    state: web::Data<AppState>,
    body: web::Json<BorrowRequest>,
) -> Result<HttpResponse, StockError> {
    body.validate()?;
    let resultat = MouvementService::borrow(&state, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "mouvement": resultat.mouvement,
        "stockActuel": resultat.produit.stock_actuel,
    })))
}

/// POST /api/movements/return - Retour total ou partiel d'un prêt
#[post("/return")]
pub async fn return_movement(
    state: web::Data<AppState>,
    body: web::Json<ReturnRequest>,
) -> Result<HttpResponse, StockError> {
    body.validate()?;
    let resultat = MouvementService::return_movement(&state, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "complet": resultat.est_complet(),
        "pret": resultat.pret,
        "retour": resultat.retour,
        "stockActuel": resultat.produit.stock_actuel,
    })))
}

/// POST /api/movements/deposit - Dépôt direct ou sur modèle (variante)
#[post("/deposit")]
pub async fn deposit(
    state: web::Data<AppState>,
    body: web::Json<DepositRequest>,
) -> Result<HttpResponse, StockError> {
    body.validate()?;
    let resultat = MouvementService::deposit(&state, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "mouvement": resultat.mouvement,
        "produit": resultat.produit,
        "varianteCreee": resultat.variante_creee,
    })))
}

/// GET /api/movements/user/{userId}/actifs - Prêts en cours
#[get("/user/{user_id}/actifs")]
pub async fn active_loans(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let prets = MouvementService::prets_actifs(&state.db, path.into_inner()).await?;

    let response: Vec<PretActifResponse> = prets
        .into_iter()
        .map(|(pret, produit)| PretActifResponse {
            movement_id: pret.id,
            produit_id: pret.produit_id,
            nom_produit: produit.map(|p| p.nom).unwrap_or_default(),
            quantite: pret.quantite,
            type_mouvement: pret.type_mouvement,
            date: pret.date,
            date_retour_prevu: pret.date_retour_prevu,
        })
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

pub fn movements_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/movements")
            .service(borrow)
            .service(return_movement)
            .service(deposit)
            .service(active_loans)
    );
}
