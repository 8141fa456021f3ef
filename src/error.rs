use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Message plus Postgres detail/hint, used for per-row error strings.
    pub fn row_detail(&self) -> String {
        let AppError::Database(sqlx::Error::Database(db_err)) = self else {
            return self.to_string();
        };

        let mut out = db_err.message().to_string();
        if let Some(pg) = db_err.try_downcast_ref::<PgDatabaseError>() {
            if let Some(detail) = pg.detail() {
                out.push_str(&format!(" (Details: {})", detail));
            }
            if let Some(hint) = pg.hint() {
                out.push_str(&format!(" (Hinweis: {})", hint));
            }
        }
        out
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            AppError::Conflict(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) | AppError::Csv(_) | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                "Datenbank nicht erreichbar oder Anfrage fehlgeschlagen".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_detail_falls_back_to_display() {
        let err = AppError::Store("kaputt".to_string());
        assert_eq!(err.row_detail(), "Store error: kaputt");
    }

    #[test]
    fn conflict_counts_as_unique_violation() {
        assert!(AppError::Conflict("invoice_number".into()).is_unique_violation());
        assert!(!AppError::NotFound("x".into()).is_unique_violation());
    }
}
