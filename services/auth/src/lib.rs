//! Credential store and session tokens
//!
//! This crate owns user identity records, Argon2id password hashing and the
//! stateless HS256 session tokens that gate every protected request.

pub mod error;
pub mod jwt;
pub mod models;
pub mod password;
pub mod repositories;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use jwt::{JwtConfig, JwtService, TokenIdentity};
pub use models::{LoginCredentials, NewUser, User, UserProfile};
pub use password::HashingConfig;
pub use repositories::UserRepository;
