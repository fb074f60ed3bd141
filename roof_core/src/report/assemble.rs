//! # Report Assembly
//!
//! Combines a [`Measurement`], its waste table and property metadata into a
//! two-page [`ReportDocument`].
//!
//! ## Line Lengths
//!
//! No roof-line detection exists; ridge, rake and eave totals are fixed
//! ratios of the measured area and perimeter, matching the report template:
//!
//! - ridge = round(√area × 1.2)
//! - rake  = round(perimeter × 0.3)
//! - eave  = round(√area × 2.8)
//! - hips and valleys are always 0
//!
//! ## Example
//!
//! ```rust
//! use roof_core::geometry::{measure, Point};
//! use roof_core::report::{ReportAssembler, ReportInput};
//!
//! let outline = vec![
//!     Point::new(-97.74310, 30.26720),
//!     Point::new(-97.74291, 30.26720),
//!     Point::new(-97.74291, 30.26736),
//!     Point::new(-97.74310, 30.26736),
//! ];
//! let measurement = measure(&outline).unwrap();
//!
//! let input = ReportInput::for_measurement("100 Congress Ave, Austin, TX", measurement.centroid, measurement).unwrap();
//! let report = ReportAssembler::default().assemble(input).unwrap();
//!
//! assert_eq!(report.pages.len(), 2);
//! assert_eq!(report.waste_rows().unwrap().len(), 9);
//! ```

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{
    CapturedImage, ImageLabel, ImageSection, LineTotal, Page, PitchRow, Placement, ReportDocument, Section,
    StructureTotals, SummaryEntry, COMPLEXITY_OPTIONS, DIAGRAM_DISCLAIMER, LENGTH_DIAGRAM_LABEL,
};
use crate::errors::{RoofError, RoofResult};
use crate::geometry::{Measurement, Point};
use crate::settings::ReportSettings;
use crate::waste::{generate_waste_table, WasteRow};

const RIDGE_RATIO: f64 = 1.2;
const RAKE_RATIO: f64 = 0.3;
const EAVE_RATIO: f64 = 2.8;

/// Where the captured image sits on the diagram page
const IMAGE_PLACEMENT: Placement = Placement {
    x_pt: 50.0,
    y_pt: 280.0,
    width_pt: 400.0,
    height_pt: 300.0,
};

/// Everything needed to assemble one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub address: String,

    /// Property location (longitude, latitude)
    pub coordinates: Point,

    /// Required; `None` fails with `MissingMeasurement`
    pub measurement: Option<Measurement>,

    pub waste_table: Vec<WasteRow>,

    pub captured_image: Option<CapturedImage>,
}

impl ReportInput {
    /// Input with no measurement yet
    pub fn new(address: impl Into<String>, coordinates: Point) -> Self {
        ReportInput {
            address: address.into(),
            coordinates,
            measurement: None,
            waste_table: Vec::new(),
            captured_image: None,
        }
    }

    /// Input for a measurement, with the waste table generated from its area.
    pub fn for_measurement(
        address: impl Into<String>,
        coordinates: Point,
        measurement: Measurement,
    ) -> RoofResult<Self> {
        let waste_table = generate_waste_table(measurement.area_sq_ft.0)?;
        Ok(ReportInput::new(address, coordinates)
            .with_measurement(measurement)
            .with_waste_table(waste_table))
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }

    pub fn with_waste_table(mut self, rows: Vec<WasteRow>) -> Self {
        self.waste_table = rows;
        self
    }

    pub fn with_image(mut self, image: CapturedImage) -> Self {
        self.captured_image = Some(image);
        self
    }
}

/// Derived roof line totals in whole feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLengths {
    pub ridge_ft: f64,
    pub hip_ft: f64,
    pub valley_ft: f64,
    pub rake_ft: f64,
    pub eave_ft: f64,
}

impl LineLengths {
    pub fn from_measurement(measurement: &Measurement) -> Self {
        let side = measurement.area_sq_ft.0.sqrt();
        LineLengths {
            ridge_ft: (side * RIDGE_RATIO).round(),
            hip_ft: 0.0,
            valley_ft: 0.0,
            rake_ft: (measurement.perimeter_ft.0 * RAKE_RATIO).round(),
            eave_ft: (side * EAVE_RATIO).round(),
        }
    }
}

/// Builds report documents with fixed presentation settings.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    settings: ReportSettings,
}

impl ReportAssembler {
    pub fn new(settings: ReportSettings) -> Self {
        ReportAssembler { settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Assemble a report stamped with the current time.
    pub fn assemble(&self, input: ReportInput) -> RoofResult<ReportDocument> {
        self.assemble_at(input, Utc::now())
    }

    /// Assemble a report stamped with `generated_at`. Deterministic.
    ///
    /// # Errors
    ///
    /// * `RoofError::MissingMeasurement` - `input.measurement` is `None`
    /// * `RoofError::InvalidMeasurement` - negative area, perimeter or
    ///   adjusted waste area
    /// * `RoofError::InvalidInput` - coordinates are not a valid location
    ///
    /// An undecodable captured image is not an error; the image section is
    /// left out.
    pub fn assemble_at(&self, input: ReportInput, generated_at: DateTime<Utc>) -> RoofResult<ReportDocument> {
        let measurement = input.measurement.as_ref().ok_or(RoofError::MissingMeasurement)?;
        measurement.validate()?;
        validate_waste_table(&input.waste_table)?;
        if !input.coordinates.is_valid() {
            return Err(RoofError::invalid_input(
                "coordinates",
                format!("[{}, {}]", input.coordinates.lon, input.coordinates.lat),
                "Property coordinates must be a valid longitude/latitude",
            ));
        }

        let report_id = self.report_id(generated_at);
        let date = generated_at.format("%m/%d/%Y").to_string();
        let lines = LineLengths::from_measurement(measurement);

        debug!(
            "assembling report {} for '{}': {} sq ft, lines {:?}",
            report_id, input.address, measurement.area_sq_ft.0, lines
        );

        let summary_page = Page {
            number: 1,
            sections: vec![
                self.header(&date),
                Section::Summary {
                    heading: None,
                    entries: vec![
                        SummaryEntry::new("Address", input.address.clone()),
                        SummaryEntry::new("Report #", report_id.clone()),
                    ],
                },
                Section::PitchTable {
                    rows: vec![PitchRow {
                        pitch: self.settings.predominant_pitch.clone(),
                        area_sq_ft: measurement.area_sq_ft.0,
                        percent_of_roof: 100.0,
                    }],
                },
                Section::Complexity {
                    options: COMPLEXITY_OPTIONS.iter().map(|o| o.to_string()).collect(),
                    selected: self.settings.structure_complexity.clone(),
                },
                Section::WasteTable {
                    rows: input.waste_table.clone(),
                },
                Section::Totals(self.totals(measurement, &lines)),
                Section::Summary {
                    heading: Some("Property Location".to_string()),
                    entries: vec![
                        SummaryEntry::new("Longitude", format!("{:.6}", input.coordinates.lon)),
                        SummaryEntry::new("Latitude", format!("{:.6}", input.coordinates.lat)),
                    ],
                },
            ],
        };

        let mut diagram_sections = vec![
            self.header(&date),
            Section::Label {
                text: LENGTH_DIAGRAM_LABEL.to_string(),
            },
            Section::LineLengths(lines),
        ];
        if let Some(image) = input.captured_image.as_ref().and_then(|c| embed_image(c, &lines)) {
            diagram_sections.push(Section::Image(image));
        }
        diagram_sections.push(Section::Note {
            text: DIAGRAM_DISCLAIMER.to_string(),
        });

        Ok(ReportDocument {
            report_id,
            title: self.settings.title.clone(),
            address: input.address,
            generated_at,
            pages: vec![
                summary_page,
                Page {
                    number: 2,
                    sections: diagram_sections,
                },
            ],
        })
    }

    /// Prefix plus the last six digits of the millisecond timestamp
    fn report_id(&self, generated_at: DateTime<Utc>) -> String {
        let millis = generated_at.timestamp_millis().rem_euclid(1_000_000);
        format!("{}{:06}", self.settings.report_id_prefix, millis)
    }

    fn header(&self, date: &str) -> Section {
        Section::Header {
            title: self.settings.title.clone(),
            date: date.to_string(),
        }
    }

    fn totals(&self, measurement: &Measurement, lines: &LineLengths) -> StructureTotals {
        StructureTotals {
            total_facets: 1,
            ridges: LineTotal {
                length_ft: lines.ridge_ft,
                count: 1,
            },
            hips: LineTotal {
                length_ft: lines.hip_ft,
                count: 0,
            },
            valleys: LineTotal {
                length_ft: lines.valley_ft,
                count: 0,
            },
            rakes: LineTotal {
                length_ft: lines.rake_ft,
                count: 2,
            },
            eaves: LineTotal {
                length_ft: lines.eave_ft,
                count: 4,
            },
            predominant_pitch: self.settings.predominant_pitch.clone(),
            total_area_sq_ft: measurement.area_sq_ft.0,
        }
    }
}

fn validate_waste_table(rows: &[WasteRow]) -> RoofResult<()> {
    for row in rows {
        if !row.adjusted_area_sq_ft.is_finite() || row.adjusted_area_sq_ft < 0.0 {
            return Err(RoofError::invalid_measurement(
                format!("waste_table[{}%].adjusted_area_sq_ft", row.waste_percent),
                row.adjusted_area_sq_ft,
                "Adjusted area must be a non-negative number",
            ));
        }
    }
    Ok(())
}

/// Best effort: a capture that does not decode is dropped with a warning
fn embed_image(capture: &CapturedImage, lines: &LineLengths) -> Option<ImageSection> {
    match capture.decode() {
        Ok(image) => Some(ImageSection {
            image,
            placement: IMAGE_PLACEMENT,
            labels: vec![
                ImageLabel {
                    text: format!("{}'", lines.ridge_ft),
                    x_pt: 200.0,
                    y_pt: 350.0,
                },
                ImageLabel {
                    text: format!("{}'", lines.eave_ft),
                    x_pt: 250.0,
                    y_pt: 520.0,
                },
            ],
        }),
        Err(e) => {
            warn!("captured image left out of report: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::measure;
    use crate::report::capture::tests::encoded_image;
    use crate::units::{Feet, SqFt};
    use chrono::TimeZone;
    use image::ImageOutputFormat;

    /// Square of roughly 3,500 sq ft in Austin, TX
    fn austin_outline() -> Vec<Point> {
        let (lon, lat): (f64, f64) = (-97.7431, 30.2672);
        let side_m = (3500.0_f64 / 10.7639).sqrt();
        let dlat = side_m / 110_852.0;
        let dlon = side_m / (111_320.0 * lat.to_radians().cos());
        vec![
            Point::new(lon, lat),
            Point::new(lon + dlon, lat),
            Point::new(lon + dlon, lat + dlat),
            Point::new(lon, lat + dlat),
            Point::new(lon, lat),
        ]
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 14, 30, 0).unwrap()
    }

    fn austin_input() -> ReportInput {
        let measurement = measure(&austin_outline()).unwrap();
        ReportInput::for_measurement("100 Congress Ave, Austin, TX 78701", Point::new(-97.7431, 30.2672), measurement)
            .unwrap()
    }

    #[test]
    fn test_end_to_end_square() {
        let input = austin_input();
        let measurement = input.measurement.clone().unwrap();
        assert!((measurement.area_sq_ft.0 - 3500.0).abs() < 35.0);

        let report = ReportAssembler::default().assemble_at(input, fixed_time()).unwrap();

        let page1 = report.page(1).unwrap();
        let waste_rows = page1
            .sections
            .iter()
            .find_map(|s| match s {
                Section::WasteTable { rows } => Some(rows),
                _ => None,
            })
            .unwrap();
        assert_eq!(waste_rows.len(), 9);

        let area = measurement.area_sq_ft.0;
        let perimeter = measurement.perimeter_ft.0;
        let totals = report.totals().unwrap();
        assert_eq!(totals.ridges.length_ft, (area.sqrt() * 1.2).round());
        assert_eq!(totals.rakes.length_ft, (perimeter * 0.3).round());
        assert_eq!(totals.eaves.length_ft, (area.sqrt() * 2.8).round());
        assert_eq!(totals.valleys.length_ft, 0.0);
        assert_eq!(totals.total_area_sq_ft, area);
    }

    #[test]
    fn test_page_one_section_order() {
        let report = ReportAssembler::default().assemble_at(austin_input(), fixed_time()).unwrap();
        let kinds: Vec<&str> = report.pages[0]
            .sections
            .iter()
            .map(|s| match s {
                Section::Header { .. } => "header",
                Section::Summary { .. } => "summary",
                Section::PitchTable { .. } => "pitch",
                Section::Complexity { .. } => "complexity",
                Section::WasteTable { .. } => "waste",
                Section::Totals(_) => "totals",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["header", "summary", "pitch", "complexity", "waste", "totals", "summary"]);

        match &report.pages[0].sections[3] {
            Section::Complexity { selected, options } => {
                assert_eq!(selected, "Normal");
                assert_eq!(options.len(), 3);
            }
            other => panic!("unexpected section {:?}", other),
        }
    }

    #[test]
    fn test_header_and_location() {
        let report = ReportAssembler::default().assemble_at(austin_input(), fixed_time()).unwrap();
        assert_eq!(report.title, "RoofIQ Premium Report");
        assert_eq!(
            report.pages[0].sections[0],
            Section::Header {
                title: "RoofIQ Premium Report".to_string(),
                date: "05/17/2024".to_string(),
            }
        );

        match report.pages[0].sections.last().unwrap() {
            Section::Summary { heading, entries } => {
                assert_eq!(heading.as_deref(), Some("Property Location"));
                assert_eq!(entries[0], SummaryEntry::new("Longitude", "-97.743100"));
                assert_eq!(entries[1], SummaryEntry::new("Latitude", "30.267200"));
            }
            other => panic!("unexpected section {:?}", other),
        }
    }

    #[test]
    fn test_report_id_from_timestamp() {
        let time = fixed_time();
        let report = ReportAssembler::default().assemble_at(austin_input(), time).unwrap();
        let expected = format!("RQ-{:06}", time.timestamp_millis() % 1_000_000);
        assert_eq!(report.report_id, expected);
        assert_eq!(report.report_id.len(), 9);
    }

    #[test]
    fn test_diagram_page_without_image() {
        let report = ReportAssembler::default().assemble_at(austin_input(), fixed_time()).unwrap();
        let page2 = report.page(2).unwrap();
        assert_eq!(page2.sections.len(), 4);
        assert_eq!(
            page2.sections[1],
            Section::Label {
                text: "LENGTH DIAGRAM".to_string()
            }
        );
        match &page2.sections[2] {
            Section::LineLengths(lines) => assert_eq!(lines.valley_ft, 0.0),
            other => panic!("unexpected section {:?}", other),
        }
        assert_eq!(
            page2.sections[3],
            Section::Note {
                text: "Note: This diagram contains segment lengths (rounded to the nearest whole number) over 5.0 Feet."
                    .to_string()
            }
        );
        assert!(report.image().is_none());
    }

    #[test]
    fn test_image_embedded_before_note() {
        let png = encoded_image(16, 12, ImageOutputFormat::Png);
        let input = austin_input().with_image(CapturedImage::from_bytes(png));
        let report = ReportAssembler::default().assemble_at(input, fixed_time()).unwrap();

        let page2 = report.page(2).unwrap();
        assert_eq!(page2.sections.len(), 5);
        match &page2.sections[3] {
            Section::Image(section) => {
                assert_eq!(section.placement, IMAGE_PLACEMENT);
                assert_eq!(section.image.width_px, 16);
                assert_eq!(section.labels.len(), 2);
            }
            other => panic!("unexpected section {:?}", other),
        }
        assert!(matches!(page2.sections[4], Section::Note { .. }));
    }

    #[test]
    fn test_corrupt_image_is_omitted() {
        let input = austin_input().with_image(CapturedImage::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]));
        let report = ReportAssembler::default().assemble_at(input, fixed_time()).unwrap();
        assert!(report.image().is_none());
        assert_eq!(report.page(2).unwrap().sections.len(), 4);
    }

    #[test]
    fn test_missing_measurement() {
        let input = ReportInput::new("1 Nowhere Rd", Point::new(-97.7431, 30.2672));
        match ReportAssembler::default().assemble(input) {
            Err(RoofError::MissingMeasurement) => {}
            other => panic!("expected MissingMeasurement, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_measurement_rejected() {
        let mut measurement = measure(&austin_outline()).unwrap();
        measurement.perimeter_ft = Feet(-10.0);
        let input = ReportInput::new("1 Main St", Point::new(-97.7431, 30.2672)).with_measurement(measurement);
        assert!(matches!(
            ReportAssembler::default().assemble(input),
            Err(RoofError::InvalidMeasurement { .. })
        ));
    }

    #[test]
    fn test_negative_waste_row_rejected() {
        let mut input = austin_input();
        input.waste_table[2].adjusted_area_sq_ft = -1.0;
        assert!(matches!(
            ReportAssembler::default().assemble(input),
            Err(RoofError::InvalidMeasurement { .. })
        ));
    }

    #[test]
    fn test_line_lengths_formulas() {
        let mut measurement = measure(&austin_outline()).unwrap();
        measurement.area_sq_ft = SqFt(2500.0);
        measurement.perimeter_ft = Feet(205.0);
        let lines = LineLengths::from_measurement(&measurement);
        assert_eq!(lines.ridge_ft, 60.0);
        // 205 * 0.3 = 61.5 rounds away from zero
        assert_eq!(lines.rake_ft, 62.0);
        assert_eq!(lines.eave_ft, 140.0);
    }

    #[test]
    fn test_custom_settings() {
        let settings = ReportSettings {
            title: "Acme Roof Report".to_string(),
            predominant_pitch: "8/12".to_string(),
            ..ReportSettings::default()
        };
        let report = ReportAssembler::new(settings).assemble_at(austin_input(), fixed_time()).unwrap();
        assert_eq!(report.title, "Acme Roof Report");
        assert_eq!(report.totals().unwrap().predominant_pitch, "8/12");
    }

    #[test]
    fn test_document_json() {
        let png = encoded_image(2, 2, ImageOutputFormat::Png);
        let input = austin_input().with_image(CapturedImage::from_bytes(png));
        let report = ReportAssembler::default().assemble_at(input, fixed_time()).unwrap();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"kind\": \"waste_table\""));
        assert!(json.contains("\"is_suggested\": true"));

        let back: ReportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.report_id, report.report_id);
        assert_eq!(back.waste_rows().unwrap().len(), 9);
        assert_eq!(back.image().unwrap().image.data, report.image().unwrap().image.data);
    }
}
