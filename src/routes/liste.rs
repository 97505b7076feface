use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;

use crate::error::StockError;
use crate::models::dto::{AddItemRequest, ValidationResponse};
use crate::services::liste_service::ListeService;
use crate::state::AppState;

/// POST /api/liste/add - Ajouter une action à la liste (aussi rejoué par la file hors-ligne)
#[post("/add")]
pub async fn add_item(
    state: web::Data<AppState>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, StockError> {
    let item = ListeService::add_item(&state, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(item))
}

/// GET /api/liste/{userId}
#[get("/{user_id}")]
pub async fn get_liste(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let liste = ListeService::get_liste(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(liste))
}

/// POST /api/liste/{userId}/validate - Tout ou rien
#[post("/{user_id}/validate")]
pub async fn validate_liste(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let resume = ListeService::validate_and_commit(&state, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ValidationResponse {
        success: true,
        mouvements_crees: resume.mouvements_crees,
        results: resume.resultats,
    }))
}

/// DELETE /api/liste/item/{itemId}
#[delete("/item/{item_id}")]
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    ListeService::remove_item(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/liste/{userId}/clear
#[delete("/{user_id}/clear")]
pub async fn clear_liste(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let supprimes = ListeService::clear(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "itemsSupprimes": supprimes })))
}

pub fn liste_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/liste")
            .service(add_item)
            .service(remove_item)
            .service(get_liste)
            .service(validate_liste)
            .service(clear_liste)
    );
}
