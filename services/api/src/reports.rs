//! Aggregation engine: dashboard statistics, CSV export and barcodes
//!
//! Everything here is read-only against the product table. Multi-query
//! reads run inside one transaction so the figures they return describe
//! the same snapshot.

use common::error::DatabaseError;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::product::Product;

pub mod barcode;
pub mod csv_export;

pub use barcode::BarcodeError;

/// Size of the low-stock sample on the dashboard
pub const LOW_STOCK_SAMPLE_SIZE: i64 = 5;

/// Errors raised while building reports
#[derive(Error, Debug)]
pub enum ReportError {
    /// Input rejected before rendering
    #[error("{0}")]
    Validation(String),

    /// The symbology cannot represent the input
    #[error(transparent)]
    Encoding(BarcodeError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<BarcodeError> for ReportError {
    fn from(err: BarcodeError) -> Self {
        match err {
            BarcodeError::EmptySku => ReportError::Validation(err.to_string()),
            other => ReportError::Encoding(other),
        }
    }
}

impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        ReportError::Database(DatabaseError::from_query(err))
    }
}

/// Type alias for Result with ReportError
pub type ReportResult<T> = Result<T, ReportError>;

/// Dashboard summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_products: i64,
    /// Sum of all quantities; zero for an empty store
    pub total_stock: i64,
    pub low_stock_count: i64,
    /// Up to five low-stock products
    pub low_stock_products: Vec<Product>,
}

/// Read-only report service over the product table
#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
}

impl ReportService {
    /// Create a new report service
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Compute dashboard statistics from a single snapshot
    pub async fn dashboard_stats(&self) -> ReportResult<DashboardStats> {
        let mut tx = self.pool.begin().await?;

        let (total_products, total_stock): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(quantity), 0) FROM products")
                .fetch_one(&mut *tx)
                .await?;

        let low_stock_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE status = 'low_stock'")
                .fetch_one(&mut *tx)
                .await?;

        let low_stock_products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, quantity, location, status, created_at, updated_at
            FROM products
            WHERE status = 'low_stock'
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(LOW_STOCK_SAMPLE_SIZE)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            total_products,
            total_stock, low_stock_count, "Computed dashboard statistics"
        );
        Ok(DashboardStats {
            total_products,
            total_stock,
            low_stock_count,
            low_stock_products,
        })
    }

    /// Export every product as CSV, ordered by id
    pub async fn export_csv(&self) -> ReportResult<Vec<u8>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, quantity, location, status, created_at, updated_at
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let bytes = csv_export::write_products(&products)?;
        info!(rows = products.len(), bytes = bytes.len(), "Exported products to CSV");
        Ok(bytes)
    }

    /// Render a Code 128 PNG for `sku`. The SKU need not exist in the store.
    pub fn barcode_png(&self, sku: &str) -> ReportResult<Vec<u8>> {
        let png = barcode::render_png(sku)?;
        debug!(sku, bytes = png.len(), "Rendered barcode");
        Ok(png)
    }
}
