//! Location service wire records
//!
//! JSON shapes returned by the location service. These types are decoded
//! as-is and normalized into cache types by the reconcilers.

use serde::{Deserialize, Serialize};

// =============================================================================
// RECORDS
// =============================================================================

/// A floor map (`GET /map`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// A zone with its occupancy count (`GET /zone?map_id=X`, `GET /map/X/zone`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub id: String,
    pub name: String,
    pub map_id: String,
    #[serde(default)]
    pub count: i64,
}

/// A tracked device or user (`GET /entity`)
///
/// Entities that timed out on the service side are reported with
/// `x = y = -1` and an empty `map_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(default)]
    pub map_id: String,
    pub x: f64,
    pub y: f64,
    /// Unix timestamp in seconds
    #[serde(default, rename = "last_seen")]
    pub last_seen_epoch_seconds: i64,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub display_org: String,
}

// =============================================================================
// TESTS
// =============================================================================
