//! Core types - maps, bounds, and the entity cache
//!
//! These types hold the normalized state the reconcilers work on.

use std::collections::HashMap;

use super::constants::MAP_IMAGE_DIR;
use super::format::format_last_seen;
use super::markers::{MarkerState, PopupCard};
use super::protocol::{EntityRecord, MapRecord};

// =============================================================================
// MAPS
// =============================================================================

/// A known floor map
#[derive(Debug, Clone, PartialEq)]
pub struct MapInfo {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
}

impl MapInfo {
    pub fn bounds(&self) -> MapBounds {
        MapBounds::new(self.width, self.height)
    }

    /// Relative URI of the floor-plan image
    pub fn image_uri(&self) -> String {
        format!("{}/{}.png", MAP_IMAGE_DIR, self.id)
    }
}

impl From<MapRecord> for MapInfo {
    fn from(record: MapRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            width: record.width,
            height: record.height,
        }
    }
}

/// Point in surface coordinates: `row` grows upward from the bottom edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub row: f64,
    pub col: f64,
}

impl PlotPoint {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

/// Extent of a floor map in map units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub width: f64,
    pub height: f64,
}

impl MapBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Inclusive containment: `0 <= x <= width`, `0 <= y <= height`
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }

    /// Convert entity coordinates to surface coordinates (y axis inverted)
    pub fn plot(&self, x: f64, y: f64) -> PlotPoint {
        PlotPoint::new(self.height - y, x)
    }

    /// South-west and north-east corners for image overlay / fit
    pub fn corners(&self) -> (PlotPoint, PlotPoint) {
        (
            PlotPoint::new(0.0, 0.0),
            PlotPoint::new(self.height, self.width),
        )
    }
}

/// The active map as seen by the reconcilers
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub map_id: String,
    pub bounds: MapBounds,
}

impl MapView {
    pub fn new(map_id: impl Into<String>, bounds: MapBounds) -> Self {
        Self {
            map_id: map_id.into(),
            bounds,
        }
    }

    /// Whether an entity at this position should have a marker
    pub fn shows(&self, map_id: &str, x: f64, y: f64) -> bool {
        self.map_id == map_id && self.bounds.contains(x, y)
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Build the lower-cased composite search key `"name // org"`
pub fn search_key(display_name: &str, display_org: &str) -> String {
    format!("{} // {}", display_name, display_org).to_lowercase()
}

/// An entity as held in the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity {
    pub id: String,
    pub map_id: String,
    pub x: f64,
    pub y: f64,
    pub display_name: String,
    pub display_org: String,
    pub zone_name: Option<String>,
    pub last_seen_epoch_seconds: i64,
    pub search_key: String,
    pub last_seen_formatted: String,
    /// Present iff the entity is visible on the active map
    pub marker: Option<MarkerState>,
}

impl CachedEntity {
    /// Normalize a wire record; the marker is decided by the reconciler
    pub fn from_record(record: EntityRecord, utc_offset_minutes: i32) -> Self {
        let search_key = search_key(&record.display_name, &record.display_org);
        let last_seen_formatted =
            format_last_seen(record.last_seen_epoch_seconds, utc_offset_minutes);
        Self {
            id: record.id,
            map_id: record.map_id,
            x: record.x,
            y: record.y,
            display_name: record.display_name,
            display_org: record.display_org,
            zone_name: record.zone_name.filter(|z| !z.is_empty()),
            last_seen_epoch_seconds: record.last_seen_epoch_seconds,
            search_key,
            last_seen_formatted,
            marker: None,
        }
    }

    /// Popup card reflecting the entity's current attributes
    pub fn card(&self) -> PopupCard {
        PopupCard {
            entity_id: self.id.clone(),
            display_name: self.display_name.clone(),
            display_org: self.display_org.clone(),
            zone_name: self
                .zone_name
                .clone()
                .unwrap_or_else(|| "None".to_string()),
            last_seen: self.last_seen_formatted.clone(),
        }
    }

    pub fn has_marker(&self) -> bool {
        self.marker.is_some()
    }
}

/// Entity cache keyed by id, iterated in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCache {
    entries: Vec<CachedEntity>,
    index: HashMap<String, usize>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CachedEntity> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut CachedEntity> {
        let i = *self.index.get(id)?;
        self.entries.get_mut(i)
    }

    /// Insert or replace by id. A replaced entry keeps its original position.
    pub fn insert(&mut self, entity: CachedEntity) {
        match self.index.get(&entity.id) {
            Some(&i) => self.entries[i] = entity,
            None => {
                self.index.insert(entity.id.clone(), self.entries.len());
                self.entries.push(entity);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedEntity> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut CachedEntity> {
        self.entries.iter_mut()
    }

    /// Ids of entities that currently own a marker
    pub fn marker_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.has_marker())
            .map(|e| e.id.clone())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
