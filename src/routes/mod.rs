pub mod health;
pub mod products;
pub mod liste;
pub mod movements;
pub mod alerts;

use actix_web::{error, web, HttpResponse};
use serde_json::json;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/api")
            .service(health::health_check)
            .configure(products::products_routes)
            .configure(liste::liste_routes)
            .configure(movements::movements_routes)
            .configure(alerts::alerts_routes)
    );
}

/// Corps JSON illisible : même format d'erreur que le reste de l'API
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(json!({
            "error": "validation_error",
            "message": err.to_string(),
        }));
        error::InternalError::from_response(err, response).into()
    })
}
