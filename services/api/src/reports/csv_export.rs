//! CSV rendering of the product table

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::product::{Product, StockStatus};

/// Column headers, in output order
pub const CSV_HEADER: [&str; 8] = [
    "ID",
    "Name",
    "SKU",
    "Quantity",
    "Location",
    "Status",
    "Created At",
    "Updated At",
];

/// Timestamp layout used for both timestamp columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed row of an export
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Status")]
    pub status: StockStatus,
    #[serde(rename = "Created At")]
    pub created_at: String,
    #[serde(rename = "Updated At")]
    pub updated_at: String,
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Render products as CSV, header first.
///
/// The whole document is built in memory; any row failure aborts the export.
pub fn write_products(products: &[Product]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for product in products {
        writer.write_record([
            product.id.to_string(),
            product.name.clone(),
            product.sku.clone(),
            product.quantity.to_string(),
            product.location.clone(),
            product.status.to_string(),
            format_timestamp(&product.created_at),
            format_timestamp(&product.updated_at),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Parse a document produced by [`write_products`]
pub fn read_products(bytes: &[u8]) -> Result<Vec<CsvRecord>, csv::Error> {
    csv::Reader::from_reader(bytes).deserialize().collect()
}
