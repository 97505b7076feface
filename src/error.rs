//! Erreurs du cœur de stock et leur traduction HTTP.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

pub type StockResult<T> = Result<T, StockError>;

#[derive(Debug, Error)]
pub enum StockError {
    /// Produit, mouvement, liste ou item introuvable
    #[error("{0}")]
    NotFound(String),

    /// Produit non validé, modèle référencé directement, prêt déjà clos...
    #[error("{0}")]
    InvalidState(String),

    /// Quantité demandée supérieure au disponible au moment de la validation
    #[error("Stock insuffisant pour {produit} : {disponible} disponible(s), {demande} demandé(s)")]
    InsufficientStock {
        produit: String,
        disponible: i32,
        demande: i32,
    },

    /// Requête mal formée (dimensions, quantités, champs manquants)
    #[error("{0}")]
    Validation(String),

    #[error("Erreur base de données : {0}")]
    Database(#[from] DbErr),
}

impl StockError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            StockError::NotFound(_) => "not_found",
            StockError::InvalidState(_) => "invalid_state",
            StockError::InsufficientStock { .. } => "insufficient_stock",
            StockError::Validation(_) => "validation_error",
            StockError::Database(_) => "database_error",
        }
    }
}

impl From<validator::ValidationErrors> for StockError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StockError::Validation(format!("Requête invalide : {errors}"))
    }
}

impl ResponseError for StockError {
    fn status_code(&self) -> StatusCode {
        match self {
            StockError::NotFound(_) => StatusCode::NOT_FOUND,
            StockError::InvalidState(_)
            | StockError::InsufficientStock { .. }
            | StockError::Validation(_) => StatusCode::BAD_REQUEST,
            StockError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_insuffisant_indique_le_disponible() {
        let err = StockError::InsufficientStock {
            produit: "Perceuse".to_string(),
            disponible: 2,
            demande: 5,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("2 disponible"));
    }

    #[test]
    fn codes_http() {
        assert_eq!(StockError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(StockError::invalid_state("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            StockError::Database(DbErr::Custom("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
