use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::models::health::HealthResponse;
use crate::state::AppState;

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match state.db.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "base de données injoignable");
            "unreachable".to_string()
        }
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        database,
        time: Utc::now(),
    };

    HttpResponse::Ok().json(response)
}
