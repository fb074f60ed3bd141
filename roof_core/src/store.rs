//! # Property Store
//!
//! The `PropertyStore` is the root container for saved roof measurements.
//! Stores serialize to `.roof` files as human-readable JSON (see
//! [`crate::file_io`]).
//!
//! ## Structure
//!
//! ```text
//! PropertyStore
//! ├── meta: StoreMetadata (schema version, timestamps)
//! ├── settings: Settings (report labels, map configuration)
//! └── properties: HashMap<Uuid, PropertyRecord>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use roof_core::geometry::{Point, Polygon};
//! use roof_core::store::{PropertyRecord, PropertyRepository, PropertyStore};
//!
//! let mut store = PropertyStore::new();
//! let outline = Polygon::new(vec![
//!     Point::new(-97.74310, 30.26720),
//!     Point::new(-97.74291, 30.26720),
//!     Point::new(-97.74291, 30.26736),
//! ]);
//! let mut record = PropertyRecord::new("100 Congress Ave", Point::new(-97.7431, 30.2672));
//! record.polygon = Some(outline);
//! record.remeasure().unwrap();
//!
//! let id = store.create(record).unwrap();
//! assert!(store.get(&id).unwrap().measurement.is_some());
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{RoofError, RoofResult};
use crate::geometry::{Measurement, Point, Polygon};
use crate::settings::Settings;

/// Current schema version for .roof files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// A property the user has traced and measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Uuid,

    pub address: String,

    /// Geocoded location of the address
    pub coordinates: Point,

    /// Traced roof outline, if one has been drawn
    #[serde(default)]
    pub polygon: Option<Polygon>,

    /// Latest measurement of `polygon`
    #[serde(default)]
    pub measurement: Option<Measurement>,

    /// Detection confidence in 0..=1, when the outline came from a model
    #[serde(default)]
    pub confidence_score: Option<f64>,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,
}

impl PropertyRecord {
    pub fn new(address: impl Into<String>, coordinates: Point) -> Self {
        let now = Utc::now();
        PropertyRecord {
            id: Uuid::new_v4(),
            address: address.into(),
            coordinates,
            polygon: None,
            measurement: None,
            confidence_score: None,
            created: now,
            updated: now,
        }
    }

    /// Recompute the measurement from the stored polygon. The previous
    /// measurement is replaced, never merged.
    ///
    /// # Errors
    ///
    /// * `RoofError::InvalidGeometry` - no polygon stored, or it has fewer than 3 points
    pub fn remeasure(&mut self) -> RoofResult<&Measurement> {
        let polygon = self
            .polygon
            .as_ref()
            .ok_or_else(|| RoofError::invalid_geometry("No roof outline has been traced for this property"))?;
        let measurement = polygon.measure()?;
        self.updated = Utc::now();
        Ok(&*self.measurement.insert(measurement))
    }

    fn validate(&self) -> RoofResult<()> {
        if let Some(score) = self.confidence_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(RoofError::invalid_input(
                    "confidence_score",
                    score.to_string(),
                    "Confidence score must be between 0 and 1",
                ));
            }
        }
        if let Some(measurement) = &self.measurement {
            measurement.validate()?;
        }
        Ok(())
    }
}

/// CRUD access to property records.
pub trait PropertyRepository {
    /// Insert a record, returning its id
    fn create(&mut self, record: PropertyRecord) -> RoofResult<Uuid>;

    fn get(&self, id: &Uuid) -> Option<&PropertyRecord>;

    /// Replace an existing record
    fn update(&mut self, record: PropertyRecord) -> RoofResult<()>;

    /// Remove a record, returning it
    fn delete(&mut self, id: &Uuid) -> RoofResult<PropertyRecord>;

    /// All records, oldest first
    fn list(&self) -> Vec<&PropertyRecord>;
}

/// Root store container.
///
/// This is the top-level struct that gets serialized to `.roof` files.
/// Records live in a flat UUID-keyed map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyStore {
    pub meta: StoreMetadata,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub properties: HashMap<Uuid, PropertyRecord>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let now = Utc::now();
        PropertyStore {
            meta: StoreMetadata {
                version: SCHEMA_VERSION.to_string(),
                created: now,
                modified: now,
            },
            settings,
            properties: HashMap::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Records whose address contains `query`, case-insensitive
    pub fn find_by_address(&self, query: &str) -> Vec<&PropertyRecord> {
        let needle = query.to_lowercase();
        let mut found: Vec<&PropertyRecord> = self
            .properties
            .values()
            .filter(|r| r.address.to_lowercase().contains(&needle))
            .collect();
        found.sort_by_key(|r| r.created);
        found
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        PropertyStore::new()
    }
}

impl PropertyRepository for PropertyStore {
    fn create(&mut self, record: PropertyRecord) -> RoofResult<Uuid> {
        record.validate()?;
        let id = record.id;
        if self.properties.contains_key(&id) {
            return Err(RoofError::invalid_input("id", id.to_string(), "A property with this id already exists"));
        }
        self.properties.insert(id, record);
        self.touch();
        debug!("created property {}", id);
        Ok(id)
    }

    fn get(&self, id: &Uuid) -> Option<&PropertyRecord> {
        self.properties.get(id)
    }

    fn update(&mut self, mut record: PropertyRecord) -> RoofResult<()> {
        let existing = self
            .properties
            .get(&record.id)
            .ok_or_else(|| RoofError::not_found("property", record.id))?;
        record.validate()?;
        record.created = existing.created;
        record.updated = Utc::now();
        debug!("updated property {}", record.id);
        self.properties.insert(record.id, record);
        self.touch();
        Ok(())
    }

    fn delete(&mut self, id: &Uuid) -> RoofResult<PropertyRecord> {
        let record = self.properties.remove(id).ok_or_else(|| RoofError::not_found("property", id))?;
        self.touch();
        Ok(record)
    }

    fn list(&self) -> Vec<&PropertyRecord> {
        let mut records: Vec<&PropertyRecord> = self.properties.values().collect();
        records.sort_by_key(|r| (r.created, r.id));
        records
    }
}

/// Store metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn outline() -> Polygon {
        Polygon::new(vec![
            Point::new(-97.74310, 30.26720),
            Point::new(-97.74291, 30.26720),
            Point::new(-97.74291, 30.26736),
            Point::new(-97.74310, 30.26736),
        ])
    }

    fn traced(address: &str) -> PropertyRecord {
        let mut record = PropertyRecord::new(address, Point::new(-97.7431, 30.2672));
        record.polygon = Some(outline());
        record
    }

    #[test]
    fn test_store_creation() {
        let store = PropertyStore::new();
        assert_eq!(store.meta.version, SCHEMA_VERSION);
        assert!(store.is_empty());
        assert_eq!(store.settings.report.title, "RoofIQ Premium Report");
    }

    #[test]
    fn test_remeasure_replaces_measurement() {
        let mut record = traced("1 Main St");
        let first = record.remeasure().unwrap().clone();
        assert!(first.area_sq_ft.0 > 0.0);

        // shrink the outline to a triangle and measure again
        let mut points = outline().points;
        points.pop();
        record.polygon = Some(Polygon::new(points));
        let second = record.remeasure().unwrap().clone();

        assert!(second.area_sq_ft.0 < first.area_sq_ft.0);
        assert_eq!(record.measurement, Some(second));
    }

    #[test]
    fn test_remeasure_without_polygon() {
        let mut record = PropertyRecord::new("1 Main St", Point::new(-97.7431, 30.2672));
        assert!(matches!(record.remeasure(), Err(RoofError::InvalidGeometry { .. })));
        assert!(record.measurement.is_none());
    }

    #[test]
    fn test_crud() {
        let mut store = PropertyStore::new();
        let mut record = traced("1 Main St");
        record.remeasure().unwrap();

        let id = store.create(record).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().address, "1 Main St");

        let mut changed = store.get(&id).unwrap().clone();
        changed.address = "1 Main Street".to_string();
        changed.confidence_score = Some(0.92);
        store.update(changed).unwrap();
        assert_eq!(store.get(&id).unwrap().address, "1 Main Street");
        assert_eq!(store.get(&id).unwrap().confidence_score, Some(0.92));

        let removed = store.delete(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(store.is_empty());
        assert!(matches!(store.delete(&id), Err(RoofError::NotFound { .. })));
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = PropertyStore::new();
        match store.update(traced("nowhere")) {
            Err(RoofError::NotFound { kind, .. }) => assert_eq!(kind, "property"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_confidence_score_range() {
        let mut store = PropertyStore::new();
        let id = store.create(traced("1 Main St")).unwrap();

        let mut record = store.get(&id).unwrap().clone();
        record.confidence_score = Some(1.5);
        assert!(matches!(store.update(record), Err(RoofError::InvalidInput { .. })));

        let mut record = traced("2 Main St");
        record.confidence_score = Some(-0.1);
        assert!(store.create(record).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = PropertyStore::new();
        let record = traced("1 Main St");
        store.create(record.clone()).unwrap();
        assert!(store.create(record).is_err());
    }

    #[test]
    fn test_list_sorted_by_creation() {
        let mut store = PropertyStore::new();
        let base = Utc::now();
        for (offset, address) in [(2, "third"), (0, "first"), (1, "second")] {
            let mut record = traced(address);
            record.created = base + Duration::seconds(offset);
            store.create(record).unwrap();
        }
        let addresses: Vec<&str> = store.list().iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_find_by_address() {
        let mut store = PropertyStore::new();
        store.create(traced("100 Congress Ave")).unwrap();
        store.create(traced("200 Lamar Blvd")).unwrap();
        assert_eq!(store.find_by_address("congress").len(), 1);
        assert!(store.find_by_address("Main").is_empty());
    }

    #[test]
    fn test_store_serialization() {
        let mut store = PropertyStore::new();
        let mut record = traced("1 Main St");
        record.remeasure().unwrap();
        let id = store.create(record).unwrap();

        let json = serde_json::to_string_pretty(&store).unwrap();
        assert!(json.contains("1 Main St"));
        assert!(json.contains("RoofIQ Premium Report"));

        let roundtrip: PropertyStore = serde_json::from_str(&json).unwrap();
        let loaded = roundtrip.get(&id).unwrap();
        assert_eq!(loaded.polygon.as_ref().unwrap().len(), 4);
        assert!(loaded.measurement.is_some());
    }
}
