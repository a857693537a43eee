//! Product models and the stock-status policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Highest quantity still reported as `low_stock`.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Stock status bucket, derived solely from quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!(
                "Invalid status '{}': expected in_stock, low_stock or out_of_stock",
                other
            )),
        }
    }
}

/// Maps a quantity to its status bucket.
///
/// This is the only place a [`StockStatus`] is ever produced for a write;
/// every mutating repository call routes through [`StockPolicy::status_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPolicy {
    low_stock_threshold: i64,
}

impl StockPolicy {
    pub fn new(low_stock_threshold: i64) -> Self {
        Self {
            low_stock_threshold,
        }
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    /// `0` (or less) is out of stock, `1..=threshold` is low, anything above is in stock
    pub fn status_for(&self, quantity: i64) -> StockStatus {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self::new(LOW_STOCK_THRESHOLD)
    }
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub location: String,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/replace payload for a product.
///
/// Requests may also carry a `status` field; it is ignored because status
/// is always recomputed from `quantity`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    pub quantity: Option<i64>,
    #[serde(default)]
    pub location: String,
}

/// A [`ProductInput`] that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub location: String,
}

impl ProductInput {
    pub fn new(name: &str, sku: &str, quantity: i64, location: &str) -> Self {
        Self {
            name: name.to_string(),
            sku: sku.to_string(),
            quantity: Some(quantity),
            location: location.to_string(),
        }
    }

    /// Check required fields and the non-negative quantity rule
    pub fn validate(&self) -> Result<ProductFields, String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if self.sku.trim().is_empty() {
            return Err("SKU is required".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("Location is required".to_string());
        }
        let quantity = self
            .quantity
            .ok_or_else(|| "Quantity is required".to_string())?;
        if quantity < 0 {
            return Err("Quantity must not be negative".to_string());
        }

        Ok(ProductFields {
            name: self.name.clone(),
            sku: self.sku.clone(),
            quantity,
            location: self.location.clone(),
        })
    }
}

/// List filter. Both conditions apply when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub status: Option<StockStatus>,
    pub low_stock: bool,
}

/// Query parameters for product listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Exact status match
    pub status: Option<String>,
    /// `true` restricts to low-stock products
    pub low_stock: Option<String>,
}

impl ProductQuery {
    pub fn into_filter(self) -> Result<ProductFilter, String> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(value) => Some(value.parse()?),
        };

        Ok(ProductFilter {
            status,
            low_stock: self.low_stock.as_deref() == Some("true"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_boundaries_at_default_threshold() {
        let policy = StockPolicy::default();
        assert_eq!(policy.status_for(0), StockStatus::OutOfStock);
        assert_eq!(policy.status_for(1), StockStatus::LowStock);
        assert_eq!(policy.status_for(LOW_STOCK_THRESHOLD), StockStatus::LowStock);
        assert_eq!(policy.status_for(LOW_STOCK_THRESHOLD + 1), StockStatus::InStock);
        assert_eq!(policy.status_for(i64::MAX), StockStatus::InStock);
    }

    #[test]
    fn test_status_is_total_over_a_range() {
        for threshold in [0, 1, 5, 10] {
            let policy = StockPolicy::new(threshold);
            for quantity in -3..=30 {
                let status = policy.status_for(quantity);
                let expected = if quantity <= 0 {
                    StockStatus::OutOfStock
                } else if quantity <= threshold {
                    StockStatus::LowStock
                } else {
                    StockStatus::InStock
                };
                assert_eq!(status, expected, "threshold {threshold}, quantity {quantity}");
                assert_eq!(policy.status_for(quantity), status);
            }
        }
    }

    #[test]
    fn test_status_string_forms() {
        for status in [
            StockStatus::InStock,
            StockStatus::LowStock,
            StockStatus::OutOfStock,
        ] {
            assert_eq!(status.as_str().parse::<StockStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.to_string())
            );
        }
        assert!("discontinued".parse::<StockStatus>().is_err());
    }

    #[test]
    fn test_input_validation() {
        assert!(ProductInput::new("Widget", "W-1", 7, "A1").validate().is_ok());
        assert!(ProductInput::new("Widget", "W-1", 0, "A1").validate().is_ok());
        assert!(ProductInput::new("", "W-1", 7, "A1").validate().is_err());
        assert!(ProductInput::new("Widget", "  ", 7, "A1").validate().is_err());
        assert!(ProductInput::new("Widget", "W-1", 7, "").validate().is_err());
        assert!(ProductInput::new("Widget", "W-1", -1, "A1").validate().is_err());

        let missing_quantity = ProductInput {
            quantity: None,
            ..ProductInput::new("Widget", "W-1", 0, "A1")
        };
        assert_eq!(
            missing_quantity.validate().unwrap_err(),
            "Quantity is required"
        );
    }

    #[test]
    fn test_status_field_in_payload_is_ignored() {
        let input: ProductInput = serde_json::from_str(
            r#"{"name":"Widget","sku":"W-1","quantity":100,"location":"A1","status":"out_of_stock"}"#,
        )
        .unwrap();
        assert_eq!(input.validate().unwrap().quantity, 100);
    }

    #[test]
    fn test_query_into_filter() {
        let filter = ProductQuery {
            status: Some("out_of_stock".into()),
            low_stock: None,
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(StockStatus::OutOfStock));
        assert!(!filter.low_stock);

        let filter = ProductQuery {
            status: Some(String::new()),
            low_stock: Some("true".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter, ProductFilter { status: None, low_stock: true });

        assert!(ProductQuery {
            status: Some("bogus".into()),
            low_stock: None,
        }
        .into_filter()
        .is_err());
    }
}
