//! Configuration du serveur, lue depuis l'environnement (`.env` chargé par dotenv).

use std::time::Duration;

use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STOCK_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_DUREE_PRET_JOURS: i64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// 0 désactive le cache de stock disponible
    pub stock_cache_ttl: Duration,
    pub duree_pret_jours: i64,
    /// Crée les tables manquantes au démarrage
    pub auto_schema: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            stock_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "STOCK_CACHE_TTL_SECS",
                DEFAULT_STOCK_CACHE_TTL_SECS,
            )?),
            duree_pret_jours: parse_or(&lookup, "DUREE_PRET_JOURS", DEFAULT_DUREE_PRET_JOURS)?,
            auto_schema: parse_or(&lookup, "AUTO_SCHEMA", true)?,
        })
    }

    pub fn duree_pret(&self) -> chrono::Duration {
        chrono::Duration::days(self.duree_pret_jours)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
