//! Application state shared across handlers

use auth::{JwtService, UserRepository};
use sqlx::SqlitePool;

use crate::{reports::ReportService, repositories::ProductRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub users: UserRepository,
    pub products: ProductRepository,
    pub reports: ReportService,
    pub jwt: JwtService,
}
