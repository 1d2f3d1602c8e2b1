//! The module contains the errors the engine can return.
//!
//! Authentication failures are coarse:
//!
//! - [`InvalidCredentials`] for any failed login, unknown user included.
//! - [`TokenExpired`] only for tokens whose signature verified.
//! - [`TokenInvalid`] for everything else a token can get wrong.
//!
//!  [`InvalidCredentials`]: EngineError::InvalidCredentials
//!  [`TokenExpired`]: EngineError::TokenExpired
//!  [`TokenInvalid`]: EngineError::TokenInvalid
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" is already registered")]
    DuplicateAccount(String),
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    TokenInvalid(String),
    #[error("Account \"{0}\" not found")]
    AccountNotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Category \"{0}\" is in use and cannot be deleted")]
    CategoryInUse(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DuplicateAccount(a), Self::DuplicateAccount(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::WrongPassword, Self::WrongPassword) => true,
            (Self::TokenExpired, Self::TokenExpired) => true,
            (Self::TokenInvalid(a), Self::TokenInvalid(b)) => a == b,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::CategoryInUse(a), Self::CategoryInUse(b)) => a == b,
            (Self::Hashing(a), Self::Hashing(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Returns `true` when a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}
