// Aides partagées par les tests : base SQLite jetable, fixtures, notifiers factices

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sea_orm::*;

use crate::config::AppConfig;
use crate::db;
use crate::models::enums::{AllowedMovements, DimensionFormat, ProductStatus};
use crate::models::produit;
use crate::services::liste_service::ResumeValidation;
use crate::services::notification_service::Notifier;
use crate::state::AppState;

/// SQLite en mémoire : une seule connexion, sinon chaque connexion voit sa propre base
pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connexion sqlite en mémoire");
    db::create_schema(&db).await.expect("création du schéma");
    db
}

/// SQLite sur fichier temporaire avec un vrai pool, pour les tests concurrents
pub async fn file_db() -> (DatabaseConnection, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("inventaire-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("connexion sqlite fichier");
    db::create_schema(&db).await.expect("création du schéma");
    (db, path)
}

pub fn produit_fixture(nom: &str, stock: i32, types: AllowedMovements) -> produit::ActiveModel {
    produit::ActiveModel {
        categorie: Set("Outillage".to_string()),
        sous_section: Set("Électroportatif".to_string()),
        nom: Set(nom.to_string()),
        unite: Set("pièce".to_string()),
        stock_actuel: Set(stock),
        stock_minimum: Set(0),
        statut: Set(ProductStatus::Valide),
        types_mouvements_autorises: Set(types),
        actif: Set(true),
        est_template: Set(false),
        est_variante: Set(false),
        format_dimension: Set(None),
        longueur: Set(None),
        largeur: Set(None),
        couleur: Set(None),
        cree_par: Set(None),
        date_creation: Set(Utc::now()),
        ..Default::default()
    }
}

pub fn template_fixture(nom: &str, format: DimensionFormat) -> produit::ActiveModel {
    let mut fixture = produit_fixture(nom, 0, AllowedMovements::Consommation);
    fixture.categorie = Set("Géomembranes".to_string());
    fixture.sous_section = Set("Chutes".to_string());
    fixture.unite = Set("m²".to_string());
    fixture.est_template = Set(true);
    fixture.format_dimension = Set(Some(format));
    fixture
}

/// Variante surface 2x5 déjà existante
pub fn variante_fixture(nom: &str, stock: i32) -> produit::ActiveModel {
    let mut fixture = produit_fixture(nom, stock, AllowedMovements::LesDeux);
    fixture.categorie = Set("Géomembranes".to_string());
    fixture.sous_section = Set("Chutes".to_string());
    fixture.est_variante = Set(true);
    fixture.format_dimension = Set(Some(DimensionFormat::Surface));
    fixture.longueur = Set(Some(5.0));
    fixture.largeur = Set(Some(2.0));
    fixture
}

pub async fn insert_produit<C: ConnectionTrait>(db: &C, fixture: produit::ActiveModel) -> produit::Model {
    fixture.insert(db).await.expect("insertion produit")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        stock_cache_ttl: Duration::from_secs(60),
        duree_pret_jours: 15,
        auto_schema: true,
    }
}

/// État applicatif avec un notifier qui n'écrit rien
pub fn test_state(db: DatabaseConnection) -> AppState {
    AppState::with_notifier(db, test_config(), Arc::new(RecordingNotifier::default()))
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub validations: Mutex<Vec<(i32, usize)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn liste_validee(&self, utilisateur_id: i32, resume: &ResumeValidation) -> anyhow::Result<()> {
        self.validations
            .lock()
            .push((utilisateur_id, resume.mouvements_crees));
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn liste_validee(&self, _utilisateur_id: i32, _resume: &ResumeValidation) -> anyhow::Result<()> {
        anyhow::bail!("service de notification indisponible")
    }
}
