use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Unauthorized.")]
    Forbidden,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("No hay stock suficiente para la planta: {0}")]
    InsufficientStock(String),

    #[error("Order could not be placed.")]
    Transaction(#[source] SqlxError),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Password error: {0}")]
    Password(String),

    #[error("Login error: {0}")]
    Login(#[from] actix_identity::error::LoginError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] VarError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Message safe to hand to the client. Server-side failures collapse
    /// into a generic line; the detail goes to the log instead.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Password(_)
            | AppError::Login(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::EnvVar(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            AppError::Transaction(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Login(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.public_message() }))
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

/// Maps unique / foreign-key violations to a client-facing validation
/// message; anything else stays a database error.
pub fn constraint_violation(err: SqlxError, unique: &str, foreign_key: &str) -> AppError {
    if let SqlxError::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::validation(unique);
        }
        // SQLite reports `ON DELETE RESTRICT` as SQLITE_CONSTRAINT_TRIGGER (1811).
        if db_err.is_foreign_key_violation() || db_err.code().as_deref() == Some("1811") {
            return AppError::validation(foreign_key);
        }
    }
    AppError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    fn body_of(err: AppError) -> serde_json::Value {
        let bytes = err.error_response().into_body().try_into_bytes().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::InsufficientStock("Monstera".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_of(err)["error"],
            "No hay stock suficiente para la planta: Monstera"
        );
        assert_eq!(body_of(AppError::NotFound("Plant"))["error"], "Plant not found.");
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn server_errors_do_not_leak_detail() {
        let err = AppError::Database(SqlxError::Protocol("SELECT * FROM secrets".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(err)["error"], "Internal server error");

        let err = AppError::Transaction(SqlxError::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(err)["error"], "Order could not be placed.");
    }
}
