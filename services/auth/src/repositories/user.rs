//! User repository for database operations
//!
//! The credential store. Uniqueness of usernames and emails is enforced by
//! the `users` table constraints; a violation at insert time is the only
//! authoritative conflict signal.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::models::{LoginCredentials, NewUser, User};
use crate::password::{HashingConfig, hash_password, verify_password};
use crate::validation::{validate_email, validate_password, validate_username};

/// Username of the account seeded into an empty store
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Email of the account seeded into an empty store
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@warehouse.com";
/// Initial password of the seeded account
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    hashing: HashingConfig,
    // Verified against when the username is unknown so both failure paths cost the same
    decoy_hash: Arc<OnceCell<String>>,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool, hashing: HashingConfig) -> Self {
        Self {
            pool,
            hashing,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a new user
    pub async fn register(&self, new_user: &NewUser) -> AuthResult<User> {
        validate_username(&new_user.username).map_err(AuthError::Validation)?;
        validate_email(&new_user.email).map_err(AuthError::Validation)?;
        validate_password(&new_user.password).map_err(AuthError::Validation)?;

        let password_hash = hash_password(self.hashing, new_user.password.clone()).await?;
        let user = self
            .insert(&new_user.username, &new_user.email, &password_hash)
            .await?;

        info!(user_id = user.id, "Registered user: {}", user.username);
        Ok(user)
    }

    /// Authenticate a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, credentials: &LoginCredentials) -> AuthResult<User> {
        let user = self.find_by_username(&credentials.username).await?;

        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.decoy_hash().await?,
        };
        let matches = verify_password(credentials.password.clone(), stored_hash).await?;

        match user {
            Some(user) if matches => {
                info!(user_id = user.id, "Login successful: {}", user.username);
                Ok(user)
            }
            _ => {
                warn!("Login failed for username: {}", credentials.username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Number of registered users
    pub async fn count(&self) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create the default administrator if no user exists.
    ///
    /// Returns `true` if the account was created. The emptiness check is
    /// repeated inside the inserting transaction so concurrent callers
    /// cannot both seed.
    pub async fn seed_default_admin(&self) -> AuthResult<bool> {
        let existing = self.count().await?;
        if existing > 0 {
            info!("Users already exist ({}), skipping default user creation", existing);
            return Ok(false);
        }

        let password_hash =
            hash_password(self.hashing, DEFAULT_ADMIN_PASSWORD.to_string()).await?;

        let mut tx = self.pool.begin().await?;
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(DEFAULT_ADMIN_USERNAME)
        .bind(DEFAULT_ADMIN_EMAIL)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Default admin user created (username: {})", DEFAULT_ADMIN_USERNAME);
        Ok(true)
    }

    async fn insert(&self, username: &str, email: &str, password_hash: &str) -> AuthResult<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn decoy_hash(&self) -> AuthResult<String> {
        let hashing = self.hashing;
        self.decoy_hash
            .get_or_try_init(|| hash_password(hashing, "decoy-password".to_string()))
            .await
            .cloned()
    }
}
