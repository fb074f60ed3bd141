//! # Settings
//!
//! Report presentation defaults and map configuration. Everything is plain
//! serde data passed explicitly to whoever needs it; there is no global
//! state. The map access token in particular is handed to the map-rendering
//! front end as a parameter rather than being set ambiently.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "report": {
//!     "title": "RoofIQ Premium Report",
//!     "predominant_pitch": "6/12",
//!     "structure_complexity": "Normal",
//!     "report_id_prefix": "RQ-"
//!   },
//!   "map": {
//!     "access_token": null,
//!     "style_url": "mapbox://styles/mapbox/satellite-v9",
//!     "default_center": [-97.7431, 30.2672],
//!     "default_zoom": 15.0,
//!     "capture_zoom": 22.0
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{RoofError, RoofResult};
use crate::geometry::Point;

/// Environment variable that overrides [`MapSettings::access_token`]
pub const MAP_TOKEN_ENV: &str = "ROOFIQ_MAP_TOKEN";

/// Highest zoom level the tile service offers
pub const MAX_ZOOM: f64 = 24.0;

/// Top-level settings container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub report: ReportSettings,
    pub map: MapSettings,
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> RoofResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RoofError::file_error("read settings", path.display().to_string(), e.to_string()))?;

        let settings: Settings = serde_json::from_str(&contents).map_err(|e| RoofError::SerializationError {
            reason: format!("Invalid settings JSON in {}: {}", path.display(), e),
        })?;
        settings.validate()?;

        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply environment overrides (currently only the map token).
    pub fn apply_env(mut self) -> Self {
        if let Ok(token) = std::env::var(MAP_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("map access token taken from {}", MAP_TOKEN_ENV);
                self.map.access_token = Some(token.trim().to_string());
            }
        }
        self
    }

    pub fn validate(&self) -> RoofResult<()> {
        self.report.validate()?;
        self.map.validate()
    }
}

/// Fixed labels printed on every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Title printed at the top of every page
    pub title: String,

    /// Pitch shown in the pitch table and totals (not measured)
    pub predominant_pitch: String,

    /// Structure complexity label (no classification is performed)
    pub structure_complexity: String,

    /// Prefix of generated report ids
    pub report_id_prefix: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            title: "RoofIQ Premium Report".to_string(),
            predominant_pitch: "6/12".to_string(),
            structure_complexity: "Normal".to_string(),
            report_id_prefix: "RQ-".to_string(),
        }
    }
}

impl ReportSettings {
    fn validate(&self) -> RoofResult<()> {
        if self.title.trim().is_empty() {
            return Err(RoofError::invalid_input("report.title", "", "Report title cannot be empty"));
        }
        Ok(())
    }
}

/// Configuration for the external map-rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Tile service access token
    pub access_token: Option<String>,

    /// Satellite style
    pub style_url: String,

    /// Where the map opens before an address is chosen
    pub default_center: Point,

    pub default_zoom: f64,

    /// Zoom used when flying to a selected address for tracing
    pub capture_zoom: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            access_token: None,
            style_url: "mapbox://styles/mapbox/satellite-v9".to_string(),
            default_center: Point::new(-97.7431, 30.2672),
            default_zoom: 15.0,
            capture_zoom: 22.0,
        }
    }
}

impl MapSettings {
    fn validate(&self) -> RoofResult<()> {
        for (field, zoom) in [("map.default_zoom", self.default_zoom), ("map.capture_zoom", self.capture_zoom)] {
            if !(0.0..=MAX_ZOOM).contains(&zoom) {
                return Err(RoofError::invalid_input(
                    field,
                    zoom.to_string(),
                    format!("Zoom must be between 0 and {}", MAX_ZOOM),
                ));
            }
        }
        if !self.default_center.is_valid() {
            return Err(RoofError::invalid_input(
                "map.default_center",
                format!("{:?}", self.default_center),
                "Center must be a valid longitude/latitude",
            ));
        }
        Ok(())
    }

    /// True once a token has been configured
    pub fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
