//! Error types for the Doorman system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DoormanError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Mail dispatch failed: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DoormanResult<T> = Result<T, DoormanError>;
