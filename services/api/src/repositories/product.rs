//! Product repository: the inventory store
//!
//! Sole writer of the `products` table. Every write is a single statement
//! (or a single transaction for seeding), so a concurrent reader never sees
//! a row whose status disagrees with its quantity. SKU uniqueness is left
//! to the table constraint: of two racing writers with the same SKU one
//! fails with [`InventoryError::Conflict`].

use chrono::Utc;
use common::error::DatabaseError;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::product::{Product, ProductFilter, ProductInput, StockPolicy, StockStatus};

const PRODUCT_COLUMNS: &str =
    "id, name, sku, quantity, location, status, created_at, updated_at";

/// Sample catalog inserted into an empty store: (name, sku, quantity, location)
const SEED_CATALOG: [(&str, &str, i64, &str); 5] = [
    ("Laptop Dell XPS 15", "LAPTOP-001", 25, "Warehouse A, Shelf 12"),
    ("Wireless Mouse Logitech MX Master 3", "MOUSE-001", 3, "Warehouse A, Shelf 3"),
    ("Mechanical Keyboard RGB", "KEYB-001", 50, "Warehouse B, Shelf 7"),
    ("Monitor 27 inch 4K", "MON-001", 0, "Warehouse A, Shelf 15"),
    ("USB-C Hub Multiport", "USB-001", 15, "Warehouse B, Shelf 2"),
];

/// Errors raised by inventory operations
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Input rejected before touching the store
    #[error("{0}")]
    Validation(String),

    /// No product with the requested id
    #[error("Product not found")]
    NotFound,

    /// Another product already uses this SKU
    #[error("A product with SKU '{0}' already exists")]
    Conflict(String),

    /// Datastore failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl InventoryError {
    fn from_write(err: sqlx::Error, sku: &str) -> Self {
        match DatabaseError::from_query(err) {
            DatabaseError::UniqueViolation(_) => InventoryError::Conflict(sku.to_string()),
            other => InventoryError::Database(other),
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::Database(DatabaseError::from_query(err))
    }
}

/// Type alias for Result with InventoryError
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Product repository for database operations
#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    policy: StockPolicy,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(pool: SqlitePool, policy: StockPolicy) -> Self {
        Self { pool, policy }
    }

    /// The status policy applied on every write
    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Create a new product
    pub async fn create(&self, input: &ProductInput) -> InventoryResult<Product> {
        let fields = input.validate().map_err(InventoryError::Validation)?;
        let status = self.policy.status_for(fields.quantity);
        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, sku, quantity, location, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(&fields.sku)
        .bind(fields.quantity)
        .bind(&fields.location)
        .bind(status)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| InventoryError::from_write(e, &fields.sku))?;

        info!(
            product_id = product.id,
            sku = %product.sku,
            quantity = product.quantity,
            status = %product.status,
            "Created product"
        );
        Ok(product)
    }

    /// Get a product by ID
    pub async fn get(&self, id: i64) -> InventoryResult<Product> {
        debug!(product_id = id, "Fetching product");

        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(InventoryError::NotFound)
    }

    /// List products matching `filter`, most recently created first.
    ///
    /// AUTOINCREMENT ids are handed out in insertion order, so they order
    /// by creation without depending on timestamp text collation.
    pub async fn list(&self, filter: ProductFilter) -> InventoryResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 = 0 OR status = 'low_stock')
            ORDER BY id DESC
            "#
        ))
        .bind(filter.status)
        .bind(filter.low_stock)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), ?filter, "Listed products");
        Ok(products)
    }

    /// Replace name, SKU, quantity and location of a product wholesale.
    ///
    /// Status is recomputed from the new quantity. A missing product is
    /// reported as `NotFound` before the body is validated.
    pub async fn update(&self, id: i64, input: &ProductInput) -> InventoryResult<Product> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(InventoryError::NotFound);
        }

        let fields = input.validate().map_err(InventoryError::Validation)?;
        let status = self.policy.status_for(fields.quantity);

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = ?1, sku = ?2, quantity = ?3, location = ?4, status = ?5, updated_at = ?6
            WHERE id = ?7
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(&fields.sku)
        .bind(fields.quantity)
        .bind(&fields.location)
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InventoryError::from_write(e, &fields.sku))?
        .ok_or(InventoryError::NotFound)?;

        info!(
            product_id = product.id,
            quantity = product.quantity,
            status = %product.status,
            "Updated product"
        );
        Ok(product)
    }

    /// Delete a product permanently
    pub async fn delete(&self, id: i64) -> InventoryResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::NotFound);
        }

        info!(product_id = id, "Deleted product");
        Ok(())
    }

    /// Number of stored products
    pub async fn count(&self) -> InventoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Re-derive every stored status under the current policy.
    ///
    /// Rows written under a different low-stock threshold are rewritten in
    /// one transaction; returns the number of rows changed.
    pub async fn reconcile_statuses(&self) -> InventoryResult<usize> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(i64, i64, StockStatus)> =
            sqlx::query_as("SELECT id, quantity, status FROM products")
                .fetch_all(&mut *tx)
                .await?;

        let mut changed = 0;
        for (id, quantity, stored) in rows {
            let status = self.policy.status_for(quantity);
            if status == stored {
                continue;
            }
            sqlx::query("UPDATE products SET status = ?1 WHERE id = ?2")
                .bind(status)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            debug!(product_id = id, from = %stored, to = %status, "Re-derived status");
            changed += 1;
        }
        tx.commit().await?;

        if changed > 0 {
            info!(
                changed,
                threshold = self.policy.low_stock_threshold(),
                "Re-derived product statuses under current threshold"
            );
        }
        Ok(changed)
    }

    /// Insert the sample catalog if the store is empty.
    ///
    /// Returns the number of products inserted: zero when products already
    /// exist. Check and inserts share one transaction.
    pub async fn seed_catalog(&self) -> InventoryResult<usize> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tx.rollback().await?;
            info!("Products already exist ({}), skipping seeding", existing);
            return Ok(0);
        }

        let now = Utc::now();
        for (name, sku, quantity, location) in SEED_CATALOG {
            let status = self.policy.status_for(quantity);
            sqlx::query(
                r#"
                INSERT INTO products (name, sku, quantity, location, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(name)
            .bind(sku)
            .bind(quantity)
            .bind(location)
            .bind(status)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::from_write(e, sku))?;

            debug!(sku, quantity, status = %status, "Seeded product");
        }
        tx.commit().await?;

        info!("Product seeding completed ({} products)", SEED_CATALOG.len());
        Ok(SEED_CATALOG.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::database::{DatabaseConfig, init_pool};
    use std::collections::HashSet;

    async fn repository_with_threshold(threshold: i64) -> ProductRepository {
        let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
        ProductRepository::new(pool, StockPolicy::new(threshold))
    }

    async fn repository() -> ProductRepository {
        repository_with_threshold(5).await
    }

    #[tokio::test]
    async fn test_inventory_lifecycle_recomputes_status() {
        let repo = repository().await;

        let widget = repo
            .create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();
        assert_eq!(widget.status, StockStatus::InStock);

        let widget = repo
            .update(widget.id, &ProductInput::new("Widget", "W-1", 3, "A1"))
            .await
            .unwrap();
        assert_eq!(widget.status, StockStatus::LowStock);

        let widget = repo
            .update(widget.id, &ProductInput::new("Widget", "W-1", 0, "A1"))
            .await
            .unwrap();
        assert_eq!(widget.status, StockStatus::OutOfStock);

        let stored = repo.get(widget.id).await.unwrap();
        assert_eq!(stored, widget);
    }

    #[tokio::test]
    async fn test_status_matches_quantity_after_every_write() {
        let repo = repository().await;
        let policy = repo.policy();

        let product = repo
            .create(&ProductInput::new("Gadget", "G-1", 0, "B2"))
            .await
            .unwrap();
        for quantity in [0, 1, 5, 6, 100, 2] {
            let updated = repo
                .update(product.id, &ProductInput::new("Gadget", "G-1", quantity, "B2"))
                .await
                .unwrap();
            assert_eq!(updated.status, policy.status_for(updated.quantity));
        }

        let raw: Vec<(i64, String)> = sqlx::query_as("SELECT quantity, status FROM products")
            .fetch_all(&repo.pool)
            .await
            .unwrap();
        for (quantity, status) in raw {
            assert_eq!(status, policy.status_for(quantity).as_str());
        }
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let repo = repository_with_threshold(10).await;
        let product = repo
            .create(&ProductInput::new("Cable", "C-1", 10, "C3"))
            .await
            .unwrap();
        assert_eq!(product.status, StockStatus::LowStock);
    }

    #[tokio::test]
    async fn test_update_replaces_every_field() {
        let repo = repository().await;
        let original = repo
            .create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();

        let updated = repo
            .update(original.id, &ProductInput::new("Widget v2", "W-2", 8, "Z9"))
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.name, "Widget v2");
        assert_eq!(updated.sku, "W-2");
        assert_eq!(updated.location, "Z9");
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at >= original.updated_at);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let repo = repository().await;

        let negative = repo.create(&ProductInput::new("Widget", "W-1", -1, "A1")).await;
        assert!(matches!(negative, Err(InventoryError::Validation(_))));

        let unnamed = repo.create(&ProductInput::new("", "W-1", 1, "A1")).await;
        assert!(matches!(unnamed, Err(InventoryError::Validation(_))));

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_sku_conflicts_on_create_and_update() {
        let repo = repository().await;
        repo.create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();
        let other = repo
            .create(&ProductInput::new("Gadget", "G-1", 7, "A2"))
            .await
            .unwrap();

        let duplicate = repo.create(&ProductInput::new("Copy", "W-1", 1, "A3")).await;
        assert!(matches!(duplicate, Err(InventoryError::Conflict(sku)) if sku == "W-1"));

        let collide = repo
            .update(other.id, &ProductInput::new("Gadget", "W-1", 7, "A2"))
            .await;
        assert!(matches!(collide, Err(InventoryError::Conflict(_))));

        // Keeping its own SKU is not a collision
        repo.update(other.id, &ProductInput::new("Gadget", "G-1", 9, "A2"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_same_sku_yield_one_conflict() {
        let repo = repository().await;
        let input = ProductInput::new("Widget", "RACE-1", 7, "A1");

        let (a, b) = tokio::join!(repo.create(&input), repo.create(&input));
        let results = [a, b];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(InventoryError::Conflict(_))))
                .count(),
            1
        );
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_creates_on_file_database_yield_one_winner_per_sku() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            database_url: format!("sqlite://{}", dir.path().join("race.db").display()),
            max_connections: 5,
            min_connections: 1,
            connection_timeout: 30,
        };
        let repo = ProductRepository::new(init_pool(&config).await.unwrap(), StockPolicy::default());

        for round in 0..50 {
            let sku = format!("RACE-{round}");
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let repo = repo.clone();
                    let input = ProductInput::new("Race", &sku, 2, "A1");
                    tokio::spawn(async move { repo.create(&input).await })
                })
                .collect();

            let (mut created, mut conflicts) = (0, 0);
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(product) => {
                        assert_eq!(product.sku, sku);
                        created += 1;
                    }
                    Err(InventoryError::Conflict(conflicting)) => {
                        assert_eq!(conflicting, sku);
                        conflicts += 1;
                    }
                    Err(other) => panic!("unexpected error for {sku}: {other}"),
                }
            }
            assert_eq!((created, conflicts), (1, 7), "{sku}");
        }

        assert_eq!(repo.count().await.unwrap(), 50);
        repo.pool.close().await;
    }

    #[tokio::test]
    async fn test_reconcile_rederives_status_after_threshold_change() {
        let repo = repository().await;
        repo.seed_catalog().await.unwrap();
        let widget = repo
            .create(&ProductInput::new("Widget", "W-8", 8, "A1"))
            .await
            .unwrap();
        assert_eq!(widget.status, StockStatus::InStock);
        assert_eq!(repo.reconcile_statuses().await.unwrap(), 0);

        let raised = ProductRepository::new(repo.pool.clone(), StockPolicy::new(10));
        // KEYB-001 (50), LAPTOP-001 (25) and USB-001 (15) stay in stock
        assert_eq!(raised.reconcile_statuses().await.unwrap(), 1);
        assert_eq!(raised.reconcile_statuses().await.unwrap(), 0);

        let policy = raised.policy();
        for product in raised.list(ProductFilter::default()).await.unwrap() {
            assert_eq!(product.status, policy.status_for(product.quantity), "{}", product.sku);
        }
        let low: Vec<String> = raised
            .list(ProductFilter {
                status: None,
                low_stock: true,
            })
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.sku)
            .collect();
        assert_eq!(low, ["W-8", "MOUSE-001"]);
        assert_eq!(raised.get(widget.id).await.unwrap().updated_at, widget.updated_at);
    }

    #[tokio::test]
    async fn test_update_reports_missing_product_before_validating() {
        let repo = repository().await;

        let result = repo.update(404, &ProductInput::new("", "", -1, "")).await;
        assert!(matches!(result, Err(InventoryError::NotFound)));

        let product = repo
            .create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();
        let result = repo.update(product.id, &ProductInput::new("", "W-1", 7, "A1")).await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let repo = repository().await;

        assert!(matches!(repo.get(404).await, Err(InventoryError::NotFound)));
        assert!(matches!(
            repo.update(404, &ProductInput::new("Widget", "W-1", 1, "A1")).await,
            Err(InventoryError::NotFound)
        ));
        assert!(matches!(repo.delete(404).await, Err(InventoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_removes_permanently() {
        let repo = repository().await;
        let product = repo
            .create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();

        repo.delete(product.id).await.unwrap();
        assert!(matches!(repo.get(product.id).await, Err(InventoryError::NotFound)));
        assert!(matches!(repo.delete(product.id).await, Err(InventoryError::NotFound)));

        // The SKU is free again
        repo.create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let repo = repository().await;
        let out = repo.create(&ProductInput::new("Out", "O-1", 0, "A")).await.unwrap();
        let low = repo.create(&ProductInput::new("Low", "L-1", 3, "A")).await.unwrap();
        let full = repo.create(&ProductInput::new("Full", "F-1", 20, "A")).await.unwrap();

        let all = repo.list(ProductFilter::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![full.id, low.id, out.id]);

        let by_status = repo
            .list(ProductFilter {
                status: Some(StockStatus::OutOfStock),
                low_stock: false,
            })
            .await
            .unwrap();
        assert_eq!(by_status, vec![out]);

        let low_only = repo
            .list(ProductFilter {
                status: None,
                low_stock: true,
            })
            .await
            .unwrap();
        assert_eq!(low_only, vec![low]);

        let contradictory = repo
            .list(ProductFilter {
                status: Some(StockStatus::InStock),
                low_stock: true,
            })
            .await
            .unwrap();
        assert!(contradictory.is_empty());
    }

    #[tokio::test]
    async fn test_seed_catalog_spans_every_bucket_and_is_idempotent() {
        let repo = repository().await;

        assert_eq!(repo.seed_catalog().await.unwrap(), 5);
        assert_eq!(repo.seed_catalog().await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 5);

        let statuses: HashSet<StockStatus> = repo
            .list(ProductFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(statuses.len(), 3);
    }

    #[tokio::test]
    async fn test_seed_catalog_skipped_when_products_exist() {
        let repo = repository().await;
        repo.create(&ProductInput::new("Widget", "W-1", 7, "A1"))
            .await
            .unwrap();

        assert_eq!(repo.seed_catalog().await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
