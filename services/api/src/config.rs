//! Application configuration

use anyhow::Context;
use auth::{HashingConfig, JwtConfig};
use axum::http::HeaderValue;
use common::database::DatabaseConfig;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::models::product::{LOW_STOCK_THRESHOLD, StockPolicy};

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for every route except the bare `/health`
    pub api_prefix: String,
    /// Highest quantity still reported as `low_stock`
    pub low_stock_threshold: i64,
    /// Comma-separated browser origins allowed by CORS; `*` mirrors any origin
    pub cors_allowed_origins: String,
}

/// Origins of the bundled web frontend in development
pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:5173,http://localhost:8080";

/// Allowed CORS origins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_prefix: "/api".to_string(),
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load server settings from `APP_*` environment variables
    ///
    /// # Environment Variables
    /// - `APP_HOST`: Bind address (default: 0.0.0.0)
    /// - `APP_PORT`: Bind port (default: 8080)
    /// - `APP_API_PREFIX`: Route prefix (default: /api)
    /// - `APP_LOW_STOCK_THRESHOLD`: Low-stock threshold (default: 5)
    /// - `APP_CORS_ALLOWED_ORIGINS`: Comma-separated origins (default: local frontends)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config: Self = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("api_prefix", defaults.api_prefix)?
            .set_default("low_stock_threshold", defaults.low_stock_threshold)?
            .set_default("cors_allowed_origins", defaults.cors_allowed_origins)?
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.low_stock_threshold < 0 {
            return Err(ConfigError::Message(
                "APP_LOW_STOCK_THRESHOLD must not be negative".to_string(),
            ));
        }
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Message(
                "APP_API_PREFIX must start with '/'".to_string(),
            ));
        }
        self.cors_origins()?;
        Ok(())
    }

    /// Parse the configured CORS origins
    pub fn cors_origins(&self) -> Result<CorsOrigins, ConfigError> {
        let origins: Vec<&str> = self
            .cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect();

        if origins.contains(&"*") {
            return Ok(CorsOrigins::Any);
        }

        origins
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    ConfigError::Message(format!("Invalid CORS origin '{}'", origin))
                })
            })
            .collect::<Result<_, _>>()
            .map(CorsOrigins::List)
    }

    /// Route prefix without a trailing slash; empty means routes sit at the root
    pub fn normalized_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }

    pub fn stock_policy(&self) -> StockPolicy {
        StockPolicy::new(self.low_stock_threshold)
    }

    /// Host and port to bind; the host may be a name such as `localhost`
    pub fn bind_address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Everything a host adapter needs to start the service
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env().context("Failed to load server configuration")?,
            database: DatabaseConfig::from_env()
                .context("Failed to load database configuration")?,
            jwt: JwtConfig::from_env().context("Failed to load JWT configuration")?,
            hashing: HashingConfig::from_env()
                .context("Failed to load password hashing configuration")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "APP_HOST",
        "APP_PORT",
        "APP_API_PREFIX",
        "APP_LOW_STOCK_THRESHOLD",
        "APP_CORS_ALLOWED_ORIGINS",
    ];

    fn clear() {
        for var in VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.low_stock_threshold, 5);
        assert_eq!(config.normalized_prefix(), "/api");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear();
        unsafe {
            std::env::set_var("APP_HOST", "127.0.0.1");
            std::env::set_var("APP_PORT", "9000");
            std::env::set_var("APP_API_PREFIX", "/v1/");
            std::env::set_var("APP_LOW_STOCK_THRESHOLD", "10");
        }

        let config = ServerConfig::from_env().unwrap();
        clear();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.normalized_prefix(), "/v1");
        assert_eq!(config.stock_policy().low_stock_threshold(), 10);
        assert_eq!(config.bind_address(), ("127.0.0.1", 9000));
    }

    #[tokio::test]
    async fn test_bind_address_resolves_host_names() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 0,
            ..ServerConfig::default()
        };

        let listener = tokio::net::TcpListener::bind(config.bind_address())
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn test_cors_origins() {
        let defaults = ServerConfig::default().cors_origins().unwrap();
        assert_eq!(
            defaults,
            CorsOrigins::List(vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://localhost:8080"),
            ])
        );

        let any = ServerConfig {
            cors_allowed_origins: "http://a.test, *".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(any.cors_origins().unwrap(), CorsOrigins::Any);

        let invalid = ServerConfig {
            cors_allowed_origins: "http://bad\norigin".to_string(),
            ..ServerConfig::default()
        };
        assert!(invalid.cors_origins().is_err());
    }

    #[test]
    #[serial]
    fn test_negative_threshold_is_rejected() {
        clear();
        unsafe { std::env::set_var("APP_LOW_STOCK_THRESHOLD", "-1") };
        let result = ServerConfig::from_env();
        clear();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_app_config_requires_jwt_secret() {
        clear();
        unsafe { std::env::remove_var("JWT_SECRET") };
        assert!(AppConfig::from_env().is_err());
    }
}
