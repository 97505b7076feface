use actix_web::{get, post, put, web, HttpResponse};

use crate::error::StockError;
use crate::models::dto::{CreateProduitRequest, ProduitsQuery, StockDisponibleResponse, UpdateProduitRequest};
use crate::services::produit_service::ProduitService;
use crate::services::stock_service::StockService;
use crate::state::AppState;

/// GET /api/products - Catalogue avec stock disponible
#[get("")]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProduitsQuery>,
) -> Result<HttpResponse, StockError> {
    let produits = ProduitService::list_with_stock(&state.db, &state.cache, query.categorie.as_deref()).await?;
    Ok(HttpResponse::Ok().json(produits))
}

/// GET /api/products/templates - Modèles pour les dépôts
#[get("/templates")]
pub async fn list_templates(state: web::Data<AppState>) -> Result<HttpResponse, StockError> {
    let modeles = ProduitService::templates(&state.db).await?;
    Ok(HttpResponse::Ok().json(modeles))
}

/// POST /api/products - Proposer un produit (en attente de validation)
#[post("")]
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<CreateProduitRequest>,
) -> Result<HttpResponse, StockError> {
    let produit = ProduitService::create(&state.db, &state.cache, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(produit))
}

/// PUT /api/products/{id}
#[put("/{id}")]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateProduitRequest>,
) -> Result<HttpResponse, StockError> {
    let produit = ProduitService::update(&state.db, &state.cache, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(produit))
}

/// POST /api/products/{id}/valider - Revue d'un produit proposé
#[post("/{id}/valider")]
pub async fn validate_product(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let produit = ProduitService::valider(&state.db, &state.cache, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(produit))
}

/// GET /api/products/{id}/stock - Disponible (valeur en cache)
#[get("/{id}/stock")]
pub async fn get_available_stock(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, StockError> {
    let produit_id = path.into_inner();
    let stock_disponible = StockService::available_stock(&state.db, &state.cache, produit_id).await?;

    Ok(HttpResponse::Ok().json(StockDisponibleResponse {
        produit_id,
        stock_disponible,
    }))
}

pub fn products_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .service(list_products)
            .service(list_templates)
            .service(create_product)
            .service(update_product)
            .service(validate_product)
            .service(get_available_stock)
    );
}
