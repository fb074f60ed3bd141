//! # roof_core - Roof Measurement Engine
//!
//! `roof_core` turns a traced roof outline into the numbers a roofing
//! estimate needs: geodesic area and perimeter, roofing squares, a waste
//! table, and a two-page report that renders to PDF. All inputs and outputs
//! are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: measurement and report assembly are pure functions of their input
//! - **JSON-First**: all types implement Serialize/Deserialize
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use roof_core::{generate_waste_table, measure, Point};
//!
//! let outline = vec![
//!     Point::new(-97.74310, 30.26720),
//!     Point::new(-97.74291, 30.26720),
//!     Point::new(-97.74291, 30.26736),
//!     Point::new(-97.74310, 30.26736),
//! ];
//! let measurement = measure(&outline).unwrap();
//! let table = generate_waste_table(measurement.area_sq_ft.0).unwrap();
//! assert_eq!(table.len(), 9);
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - Points, polygons and geodesic measurement
//! - [`waste`] - Waste allowance table
//! - [`report`] - Page-oriented report documents
//! - [`pdf`] - Typst PDF rendering
//! - [`settings`] - Report labels and map configuration
//! - [`store`] - Saved properties
//! - [`file_io`] - `.roof` files with atomic saves and locking
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types

pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod geometry;
pub mod pdf;
pub mod report;
pub mod settings;
pub mod store;
pub mod units;
pub mod waste;

// Re-export commonly used types at crate root for convenience
pub use errors::{RoofError, RoofResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_store, save_store, FileLock};
pub use geometry::{measure, Measurement, Point, Polygon};
pub use pdf::{render_report_pdf, ReportRenderer, TypstRenderer};
pub use report::{CapturedImage, ReportAssembler, ReportDocument, ReportInput};
pub use settings::Settings;
pub use store::{PropertyRecord, PropertyRepository, PropertyStore};
pub use waste::{generate_waste_table, WasteRow};
