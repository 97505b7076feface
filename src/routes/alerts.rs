use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::error::StockError;
use crate::services::notification_service::NotificationService;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertesQuery {
    #[serde(default)]
    pub non_lues: bool,
}

/// GET /api/alerts/{userId}?nonLues=true - Alertes, plus récentes d'abord
#[get("/{user_id}")]
pub async fn list_alerts(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<AlertesQuery>,
) -> Result<HttpResponse, StockError> {
    let alertes = NotificationService::alertes_utilisateur(&state.db, path.into_inner(), query.non_lues).await?;
    Ok(HttpResponse::Ok().json(alertes))
}

/// POST /api/alerts/{id}/lue
#[post("/{id}/lue")]
pub async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let alerte_id = path.into_inner();
    let alerte = NotificationService::marquer_lue(&state.db, alerte_id)
        .await?
        .ok_or_else(|| StockError::not_found(format!("Alerte {} introuvable", alerte_id)))?;

    Ok(HttpResponse::Ok().json(alerte))
}

pub fn alerts_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/alerts")
            .service(list_alerts)
            .service(mark_read)
    );
}
