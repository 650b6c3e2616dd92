//! Entity reconciler - diffs an entity snapshot against the live cache
//!
//! `reconcile_entities` is a pure function from (prior cache, snapshot) to
//! (new cache, marker directives). The caller applies the directives to the
//! surface and then swaps the cache in one step, so readers never observe a
//! half-updated cache.

use super::markers::{MarkerDirective, MarkerState};
use super::protocol::EntityRecord;
use super::types::{CachedEntity, EntityCache, MapView};

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReconciliation {
    pub cache: EntityCache,
    pub directives: Vec<MarkerDirective>,
}

impl EntityReconciliation {
    pub fn is_quiet(&self) -> bool {
        self.directives.is_empty()
    }
}

/// Merge a full entity snapshot into a new cache.
///
/// The snapshot covers every entity in the system, not just the active map.
/// Markers survive across passes while their entity stays visible; a moved
/// entity yields `MoveMarker` rather than remove + create.
pub fn reconcile_entities(
    prior: &EntityCache,
    fetched: Vec<EntityRecord>,
    view: &MapView,
    utc_offset_minutes: i32,
) -> EntityReconciliation {
    let mut cache = EntityCache::new();
    for record in fetched {
        cache.insert(CachedEntity::from_record(record, utc_offset_minutes));
    }

    let mut directives = Vec::new();

    for entity in cache.iter_mut() {
        let previous = prior.get(&entity.id);
        let previous_marker = previous.and_then(|p| p.marker.as_ref());

        // Off-map or out of bounds: no marker, drop the old one if any
        if !view.shows(&entity.map_id, entity.x, entity.y) {
            if previous_marker.is_some() {
                directives.push(MarkerDirective::RemoveMarker {
                    entity_id: entity.id.clone(),
                });
            }
            continue;
        }

        let point = view.bounds.plot(entity.x, entity.y);
        let card = entity.card();

        let marker = match (previous, previous_marker) {
            (Some(previous), Some(previous_marker)) => {
                let mut marker = previous_marker.clone();

                if previous.x != entity.x || previous.y != entity.y {
                    marker.point = point;
                    directives.push(MarkerDirective::MoveMarker {
                        entity_id: entity.id.clone(),
                        point,
                    });
                }

                if marker.tooltip != entity.display_name {
                    marker.tooltip = entity.display_name.clone();
                    directives.push(MarkerDirective::UpdateTooltip {
                        entity_id: entity.id.clone(),
                        tooltip: entity.display_name.clone(),
                    });
                }

                // Never swap content under an open popup; the session pushes
                // the pending card when the popup closes
                if marker.bound_card != card && !marker.is_popup_open() {
                    marker.bound_card = card.clone();
                    directives.push(MarkerDirective::UpdatePopupContent {
                        entity_id: entity.id.clone(),
                        card,
                    });
                }

                marker
            }
            _ => {
                directives.push(MarkerDirective::CreateMarker {
                    entity_id: entity.id.clone(),
                    point,
                    tooltip: entity.display_name.clone(),
                    card: card.clone(),
                });
                MarkerState::new(point, entity.display_name.clone(), card)
            }
        };

        entity.marker = Some(marker);
    }

    // Entities that vanished from the snapshot
    for previous in prior.iter() {
        if previous.has_marker() && !cache.contains(&previous.id) {
            directives.push(MarkerDirective::RemoveMarker {
                entity_id: previous.id.clone(),
            });
        }
    }

    EntityReconciliation { cache, directives }
}

// =============================================================================
// TESTS
// =============================================================================
