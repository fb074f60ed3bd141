//! # Report Documents
//!
//! The page-oriented report structure handed to a renderer. A
//! [`ReportDocument`] is pure data: ordered pages of [`Section`]s, with no
//! layout engine attached. It serializes to JSON for any external consumer,
//! and [`crate::pdf`] turns it into PDF bytes.
//!
//! ## Structure
//!
//! ```text
//! ReportDocument
//! ├── Page 1: Header, Summary (address/report #), PitchTable, Complexity,
//! │           WasteTable, Totals, Summary (property location)
//! └── Page 2: Header, Label (LENGTH DIAGRAM), LineLengths, [Image], Note
//! ```

pub mod assemble;
pub mod capture;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RoofResult;
use crate::waste::WasteRow;

pub use assemble::{LineLengths, ReportAssembler, ReportInput};
pub use capture::{CapturedImage, EmbeddedImage, ImageKind};

/// Footnote printed under the length diagram
pub const DIAGRAM_DISCLAIMER: &str =
    "Note: This diagram contains segment lengths (rounded to the nearest whole number) over 5.0 Feet.";

/// Label heading the second page
pub const LENGTH_DIAGRAM_LABEL: &str = "LENGTH DIAGRAM";

/// Complexity choices printed on page 1, in order
pub const COMPLEXITY_OPTIONS: [&str; 3] = ["Simple", "Normal", "Complex"];

/// A complete, write-once report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Human-facing report number, e.g. "RQ-123456"
    pub report_id: String,

    pub title: String,

    pub address: String,

    pub generated_at: DateTime<Utc>,

    pub pages: Vec<Page>,
}

impl ReportDocument {
    /// Page by 1-based number
    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }

    /// All sections in reading order
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.pages.iter().flat_map(|p| p.sections.iter())
    }

    /// Rows of the waste table, if the report has one
    pub fn waste_rows(&self) -> Option<&[WasteRow]> {
        self.sections().find_map(|s| match s {
            Section::WasteTable { rows } => Some(rows.as_slice()),
            _ => None,
        })
    }

    pub fn totals(&self) -> Option<&StructureTotals> {
        self.sections().find_map(|s| match s {
            Section::Totals(totals) => Some(totals),
            _ => None,
        })
    }

    pub fn image(&self) -> Option<&ImageSection> {
        self.sections().find_map(|s| match s {
            Section::Image(image) => Some(image),
            _ => None,
        })
    }

    /// Pretty JSON for external renderers (image bytes as base64)
    pub fn to_json(&self) -> RoofResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One printed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub sections: Vec<Section>,
}

/// A block of report content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    /// Page title and date
    Header { title: String, date: String },

    /// Key/value block, optionally headed
    Summary {
        heading: Option<String>,
        entries: Vec<SummaryEntry>,
    },

    /// "Areas per Pitch" table
    PitchTable { rows: Vec<PitchRow> },

    /// "Structure Complexity" selector
    Complexity { options: Vec<String>, selected: String },

    /// "Waste Calculation" table
    WasteTable { rows: Vec<WasteRow> },

    /// "All Structures Totals" block
    Totals(StructureTotals),

    /// Free-standing label
    Label { text: String },

    /// "Total Line Lengths" summary for the diagram page
    LineLengths(LineLengths),

    /// Captured roof image at a fixed position
    Image(ImageSection),

    /// Footnote
    Note { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub label: String,
    pub value: String,
}

impl SummaryEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        SummaryEntry {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchRow {
    pub pitch: String,
    pub area_sq_ft: f64,
    pub percent_of_roof: f64,
}

/// A line total with the number of segments it is made of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineTotal {
    pub length_ft: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureTotals {
    pub total_facets: u32,
    pub ridges: LineTotal,
    pub hips: LineTotal,
    pub valleys: LineTotal,
    pub rakes: LineTotal,
    pub eaves: LineTotal,
    pub predominant_pitch: String,
    pub total_area_sq_ft: f64,
}

/// Position and size on the page, in points from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x_pt: f64,
    pub y_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
}

/// Text drawn over the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLabel {
    pub text: String,
    pub x_pt: f64,
    pub y_pt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSection {
    pub image: EmbeddedImage,
    pub placement: Placement,
    pub labels: Vec<ImageLabel>,
}
