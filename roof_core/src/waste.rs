//! # Waste Table
//!
//! Expands a base roof area into the waste-allowance table printed on every
//! report: for each waste percentage, the adjusted area and the number of
//! roofing squares to order.
//!
//! The percentage set `0, 1, 6, 11, 14, 16, 18, 21, 26` is the report
//! template's convention and is kept as-is, irregular spacing included.
//! Squares are rounded UP to the nearest third of a square, the increment
//! shingle bundles are sold in.
//!
//! ## Example
//!
//! ```rust
//! use roof_core::waste::{generate_waste_table, suggested_row};
//!
//! let table = generate_waste_table(1000.0).unwrap();
//! assert_eq!(table.len(), 9);
//!
//! let suggested = suggested_row(&table).unwrap();
//! assert_eq!(suggested.waste_percent, 16);
//! assert_eq!(suggested.adjusted_area_sq_ft, 1160.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{RoofError, RoofResult};
use crate::units::SQ_FT_PER_SQUARE;

/// Waste percentages in report order
pub const WASTE_PERCENTAGES: [u32; 9] = [0, 1, 6, 11, 14, 16, 18, 21, 26];

/// The waste allowance recommended by default
pub const SUGGESTED_WASTE_PERCENT: u32 = 16;

/// Squares are ordered in thirds
const SQUARE_INCREMENTS: f64 = 3.0;

/// One column of the waste table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WasteRow {
    /// Waste allowance in percent
    pub waste_percent: u32,

    /// Base area plus allowance, rounded to the whole square foot
    pub adjusted_area_sq_ft: f64,

    /// Roofing squares, rounded up to the nearest 1/3
    pub squares: f64,

    /// Rendered with emphasis (the 16% column)
    pub is_suggested: bool,
}

impl WasteRow {
    fn for_percent(base_area_sq_ft: f64, waste_percent: u32) -> Self {
        let adjusted_area_sq_ft = (base_area_sq_ft * (1.0 + waste_percent as f64 / 100.0)).round();
        let squares = ((adjusted_area_sq_ft / SQ_FT_PER_SQUARE) * SQUARE_INCREMENTS).ceil() / SQUARE_INCREMENTS;
        WasteRow {
            waste_percent,
            adjusted_area_sq_ft,
            squares,
            is_suggested: waste_percent == SUGGESTED_WASTE_PERCENT,
        }
    }

    /// Squares formatted the way the report prints them: whole numbers
    /// without decimals, thirds with two.
    pub fn squares_label(&self) -> String {
        if self.squares.fract() == 0.0 {
            format!("{:.0}", self.squares)
        } else {
            format!("{:.2}", self.squares)
        }
    }
}

/// Generate the waste table for a base area.
///
/// Rows follow [`WASTE_PERCENTAGES`] order; nothing is filtered.
///
/// # Errors
///
/// * `RoofError::InvalidMeasurement` - base area is negative or not finite
pub fn generate_waste_table(base_area_sq_ft: f64) -> RoofResult<Vec<WasteRow>> {
    if !base_area_sq_ft.is_finite() || base_area_sq_ft < 0.0 {
        return Err(RoofError::invalid_measurement(
            "base_area_sq_ft",
            base_area_sq_ft,
            "Base area must be a non-negative number",
        ));
    }

    Ok(WASTE_PERCENTAGES
        .iter()
        .map(|&percent| WasteRow::for_percent(base_area_sq_ft, percent))
        .collect())
}

/// The row flagged as the suggested allowance, if present
pub fn suggested_row(rows: &[WasteRow]) -> Option<&WasteRow> {
    rows.iter().find(|row| row.is_suggested)
}
