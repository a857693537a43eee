//! Warehouse inventory API
//!
//! The HTTP surface of the inventory service: the product store with its
//! quantity-derived stock status, dashboard and export reports, and the
//! bearer-token gateway in front of them. Host adapters in [`host`] start
//! the service either as a standalone process or on a background task.

pub mod config;
pub mod error;
pub mod host;
pub mod middleware;
pub mod models;
pub mod reports;
pub mod repositories;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use host::{EmbeddedServer, bootstrap, run_standalone};
pub use state::AppState;
