use actix_web::{web, App, HttpServer};
use anyhow::Context;

use inventaire_backend::config::AppConfig;
use inventaire_backend::state::AppState;
use inventaire_backend::{db, observability, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    observability::init();

    let config = AppConfig::from_env()?;

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("✅ Database connected!");

    if config.auto_schema {
        db::create_schema(&db).await.context("Failed to create schema")?;
    }

    let state = web::Data::new(AppState::new(db, config.clone()));

    tracing::info!(
        cache_ttl_secs = config.stock_cache_ttl.as_secs(),
        duree_pret_jours = config.duree_pret_jours,
        "🚀 Starting server on http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure_routes)
    })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?;

    Ok(())
}
