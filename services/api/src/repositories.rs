//! Repositories for database operations

pub mod product;

pub use product::{InventoryError, InventoryResult, ProductRepository};
