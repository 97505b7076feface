use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::notification_service::{AlertNotifier, Notifier};
use crate::services::stock_cache::StockCache;

/// État partagé par tous les workers actix (web::Data<AppState>)
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: Arc<StockCache>,
    pub notifier: Arc<dyn Notifier>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let notifier = Arc::new(AlertNotifier::new(db.clone()));
        Self::with_notifier(db, config, notifier)
    }

    pub fn with_notifier(db: DatabaseConnection, config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cache: Arc::new(StockCache::new(config.stock_cache_ttl)),
            db,
            notifier,
            config,
        }
    }
}
