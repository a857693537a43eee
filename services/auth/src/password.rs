//! Password hashing with Argon2id
//!
//! Hashing is deliberately expensive, so both hashing and verification run
//! on the blocking thread pool instead of stalling the async runtime.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};

use crate::error::{AuthError, AuthResult};

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes over memory
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl HashingConfig {
    /// Create a new HashingConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PASSWORD_HASH_MEMORY_KIB`: Memory cost in KiB (default: 65536)
    /// - `PASSWORD_HASH_ITERATIONS`: Time cost (default: 3)
    /// - `PASSWORD_HASH_PARALLELISM`: Lanes (default: 1)
    pub fn from_env() -> AuthResult<Self> {
        let defaults = Self::default();
        let read = |key: &str, default: u32| -> AuthResult<u32> {
            match std::env::var(key) {
                Ok(value) => value
                    .parse()
                    .map_err(|_| AuthError::Validation(format!("{} must be an integer", key))),
                Err(_) => Ok(default),
            }
        };

        let config = Self {
            memory_kib: read("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: read("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: read("PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };
        config.argon2()?;
        Ok(config)
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a raw password into a PHC string with a fresh random salt
pub async fn hash_password(config: HashingConfig, password: String) -> AuthResult<String> {
    let argon2 = config.argon2()?;
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand::thread_rng());
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Check a raw password against a stored PHC string.
///
/// The cost parameters are read from the stored hash itself.
pub async fn verify_password(password: String, password_hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed_hash =
            PasswordHash::new(&password_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const CHEAP: HashingConfig = HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password(CHEAP, "secret1".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret1"));

        assert!(verify_password("secret1".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let a = hash_password(CHEAP, "secret1".to_string()).await.unwrap();
        let b = hash_password(CHEAP, "secret1".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    #[serial]
    fn test_hashing_config_from_env() {
        let config = HashingConfig::from_env().unwrap();
        assert_eq!(config, HashingConfig::default());

        unsafe {
            std::env::set_var("PASSWORD_HASH_ITERATIONS", "not-a-number");
        }
        let result = HashingConfig::from_env();
        unsafe {
            std::env::remove_var("PASSWORD_HASH_ITERATIONS");
        }
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }
}
