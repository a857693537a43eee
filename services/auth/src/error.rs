//! Error types for the credential store and token service

use common::error::DatabaseError;
use thiserror::Error;

/// Errors raised while registering, authenticating or issuing tokens
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input rejected before touching the store
    #[error("{0}")]
    Validation(String),

    /// Username or email already taken
    #[error("Username or email already exists")]
    Conflict,

    /// Unknown username or wrong password; the two are never distinguished
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token failed signature, format or expiry checks
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Password hashing backend failure
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// Token could not be signed
    #[error("Token signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Datastore failure
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            AuthError::Conflict
        } else {
            AuthError::Database(err)
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from_query(err).into()
    }
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;
