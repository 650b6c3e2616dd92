//! Zone reconciler - occupancy counts for the active map
//!
//! The zone cache is established once per map load from the zone list.
//! Later count updates only touch zones that were known at load time; new
//! zone ids are reported and ignored until the next map load.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

use super::format::truncate_zone_name;
use super::protocol::ZoneRecord;

// =============================================================================
// ZONE CACHE
// =============================================================================

/// One row of the zone statistics panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonePanelRow {
    pub zone_id: String,
    /// Display name, truncated for the panel
    pub name: String,
    pub count: i64,
}

/// `zone id -> count` for the active map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneCache {
    map_id: String,
    counts: HashMap<String, i64>,
}

impl ZoneCache {
    pub fn new(map_id: impl Into<String>) -> Self {
        Self {
            map_id: map_id.into(),
            counts: HashMap::new(),
        }
    }

    /// Build the cache from a zone list, skipping zones of other maps.
    ///
    /// Returns the cache and the panel rows in list order.
    pub fn load(
        map_id: &str,
        records: &[ZoneRecord],
        name_max_chars: usize,
    ) -> (Self, Vec<ZonePanelRow>) {
        let mut cache = Self::new(map_id);
        let mut rows = Vec::with_capacity(records.len());

        for zone in records {
            if zone.map_id != map_id {
                warn!(
                    zone = %zone.name,
                    zone_map = %zone.map_id,
                    active_map = %map_id,
                    "[ZONES] Zone belongs to a different map, skipping"
                );
                continue;
            }
            cache.counts.insert(zone.id.clone(), zone.count);
            rows.push(ZonePanelRow {
                zone_id: zone.id.clone(),
                name: truncate_zone_name(&zone.name, name_max_chars),
                count: zone.count,
            });
        }

        (cache, rows)
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn count(&self, zone_id: &str) -> Option<i64> {
        self.counts.get(zone_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Record a count the surface now displays. Zones not admitted at load
    /// time are left out; returns whether the count was stored.
    pub fn commit(&mut self, zone_id: &str, count: i64) -> bool {
        match self.counts.get_mut(zone_id) {
            Some(stored) => {
                *stored = count;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// COUNT RECONCILIATION
// =============================================================================

/// A zone whose displayed count must be refreshed and emphasized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCountChanged {
    pub zone_id: String,
    pub previous: i64,
    pub count: i64,
}

/// A fetched zone record that was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedZone {
    ForeignMap { zone_id: String, map_id: String },
    Unknown { zone_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneReconciliation {
    pub changes: Vec<ZoneCountChanged>,
    pub skipped: Vec<SkippedZone>,
}

/// Compare fetched counts with the cache, returning the zones that changed.
///
/// The cache is not written: each change is committed with
/// `ZoneCache::commit` once it is on screen, so a change that could not be
/// displayed shows up again on the next poll. A decrease (including to
/// zero) is an ordinary change.
pub fn reconcile_zone_counts(cache: &ZoneCache, fetched: &[ZoneRecord]) -> ZoneReconciliation {
    let mut outcome = ZoneReconciliation::default();

    for zone in fetched {
        if zone.map_id != cache.map_id {
            warn!(
                zone = %zone.name,
                zone_map = %zone.map_id,
                active_map = %cache.map_id,
                "[ZONES] Zone belongs to a different map, skipping"
            );
            outcome.skipped.push(SkippedZone::ForeignMap {
                zone_id: zone.id.clone(),
                map_id: zone.map_id.clone(),
            });
            continue;
        }

        let Some(&previous) = cache.counts.get(&zone.id) else {
            warn!(
                zone_id = %zone.id,
                zone = %zone.name,
                "[ZONES] New zone detected, reload the map to track it"
            );
            outcome.skipped.push(SkippedZone::Unknown {
                zone_id: zone.id.clone(),
            });
            continue;
        };

        if previous != zone.count {
            outcome.changes.push(ZoneCountChanged {
                zone_id: zone.id.clone(),
                previous,
                count: zone.count,
            });
        }
    }

    outcome
}

// =============================================================================
// EMPHASIS
// =============================================================================

/// A highlight state the surface must apply to a zone count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightChange {
    pub zone_id: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default)]
struct BlinkState {
    highlighted: bool,
    pending: Option<(Instant, bool)>,
}

/// Transient highlight toggles for changed zone counts.
///
/// A trigger inverts the current phase immediately and schedules the
/// opposite toggle after the emphasis duration. Triggers never queue: a new
/// trigger replaces the zone's pending toggle.
#[derive(Debug, Clone)]
pub struct BlinkScheduler {
    duration: Duration,
    zones: HashMap<String, BlinkState>,
}

impl BlinkScheduler {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            zones: HashMap::new(),
        }
    }

    pub fn trigger(&mut self, zone_id: &str, now: Instant) -> HighlightChange {
        let state = self.zones.entry(zone_id.to_string()).or_default();
        state.highlighted = !state.highlighted;
        state.pending = Some((now + self.duration, !state.highlighted));
        HighlightChange {
            zone_id: zone_id.to_string(),
            highlighted: state.highlighted,
        }
    }

    /// Collect toggles that are due, ordered by zone id
    pub fn tick(&mut self, now: Instant) -> Vec<HighlightChange> {
        let mut due = Vec::new();
        for (zone_id, state) in self.zones.iter_mut() {
            if let Some((at, highlighted)) = state.pending {
                if now >= at {
                    state.highlighted = highlighted;
                    state.pending = None;
                    due.push(HighlightChange {
                        zone_id: zone_id.clone(),
                        highlighted,
                    });
                }
            }
        }
        due.sort_by(|a, b| a.zone_id.cmp(&b.zone_id));
        due
    }

    pub fn is_highlighted(&self, zone_id: &str) -> bool {
        self.zones.get(zone_id).is_some_and(|s| s.highlighted)
    }

    pub fn has_pending(&self) -> bool {
        self.zones.values().any(|s| s.pending.is_some())
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
