//! Repositories for credential storage

pub mod user;

pub use user::{DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, UserRepository};
