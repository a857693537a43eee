//! Code 128 barcode rendering
//!
//! SKUs are encoded with code set B, which covers printable ASCII. The bar
//! pattern is scaled by the largest whole factor that fits the canvas width,
//! centred horizontally, and drawn over the full canvas height.

use barcoders::sym::code128::Code128;
use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Output canvas width in pixels
pub const BARCODE_WIDTH: u32 = 200;
/// Output canvas height in pixels
pub const BARCODE_HEIGHT: u32 = 100;

/// Selects Code 128 character set B in barcoders input
const CODE_SET_B: char = 'Ɓ';

const BAR: Luma<u8> = Luma([0]);
const SPACE: Luma<u8> = Luma([255]);

/// Errors raised while rendering a barcode
#[derive(Error, Debug)]
pub enum BarcodeError {
    #[error("SKU is required")]
    EmptySku,

    #[error("SKU contains character {0:?} which Code 128 set B cannot encode")]
    UnsupportedCharacter(char),

    #[error("SKU is too long: {modules} modules do not fit the barcode canvas")]
    TooWide { modules: usize },

    #[error("Barcode encoding failed: {0}")]
    Symbology(String),

    #[error("Barcode image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encode `sku` into Code 128 modules, one byte per module (`1` = bar)
pub fn encode_modules(sku: &str) -> Result<Vec<u8>, BarcodeError> {
    if sku.trim().is_empty() {
        return Err(BarcodeError::EmptySku);
    }
    if let Some(c) = sku.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(BarcodeError::UnsupportedCharacter(c));
    }

    let symbol = Code128::new(format!("{CODE_SET_B}{sku}"))
        .map_err(|e| BarcodeError::Symbology(format!("{:?}", e)))?;
    Ok(symbol.encode())
}

/// Draw modules onto a fixed-size canvas
pub fn rasterize(modules: &[u8]) -> Result<GrayImage, BarcodeError> {
    let module_count = u32::try_from(modules.len())
        .map_err(|_| BarcodeError::TooWide {
            modules: modules.len(),
        })?;
    if module_count == 0 {
        return Err(BarcodeError::Symbology("empty bar pattern".to_string()));
    }

    let scale = BARCODE_WIDTH / module_count;
    if scale == 0 {
        return Err(BarcodeError::TooWide {
            modules: modules.len(),
        });
    }
    let offset = (BARCODE_WIDTH - module_count * scale) / 2;

    let mut canvas = GrayImage::from_pixel(BARCODE_WIDTH, BARCODE_HEIGHT, SPACE);
    for (index, module) in (0u32..).zip(modules) {
        if *module == 0 {
            continue;
        }
        let start = offset + index * scale;
        for x in start..start + scale {
            for y in 0..BARCODE_HEIGHT {
                canvas.put_pixel(x, y, BAR);
            }
        }
    }

    Ok(canvas)
}

/// Render `sku` as a 200x100 grayscale PNG
pub fn render_png(sku: &str) -> Result<Vec<u8>, BarcodeError> {
    let canvas = rasterize(&encode_modules(sku)?)?;

    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
