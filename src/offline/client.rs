use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::dto::AddItemRequest;

/// Échec d'envoi d'une action hors-ligne
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Réseau coupé, serveur injoignable ou 5xx : on peut retenter
    #[error("synchronisation requise : {0}")]
    Transient(String),

    /// Refus métier (4xx) : produit introuvable, inactif, stock insuffisant...
    #[error("{0}")]
    Terminal(String),
}

impl SubmitError {
    pub fn depuis_statut(statut: StatusCode, message: String) -> Self {
        if statut.is_server_error()
            || statut == StatusCode::REQUEST_TIMEOUT
            || statut == StatusCode::TOO_MANY_REQUESTS
        {
            SubmitError::Transient(message)
        } else {
            SubmitError::Terminal(message)
        }
    }

    pub fn est_transitoire(&self) -> bool {
        matches!(self, SubmitError::Transient(_))
    }
}

/// Point d'entrée distant des ajouts à la liste
#[async_trait]
pub trait ListeClient: Send + Sync {
    async fn add_item(&self, request: &AddItemRequest) -> Result<(), SubmitError>;
}

#[derive(Deserialize)]
struct CorpsErreur {
    message: String,
}

/// Client reqwest vers `POST {base}/api/liste/add`
#[derive(Debug, Clone)]
pub struct HttpListeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpListeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/api/liste/add", self.base_url)
    }
}

#[async_trait]
impl ListeClient for HttpListeClient {
    async fn add_item(&self, request: &AddItemRequest) -> Result<(), SubmitError> {
        let response = self
            .http
            .post(self.url())
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Transient(format!("serveur injoignable ({e})")))?;

        let statut = response.status();
        if statut.is_success() {
            return Ok(());
        }

        // Le serveur répond {"error", "message"} ; sinon on garde le statut
        let message = match response.json::<CorpsErreur>().await {
            Ok(corps) => corps.message,
            Err(_) => format!("réponse HTTP {}", statut),
        };
        Err(SubmitError::depuis_statut(statut, message))
    }
}
