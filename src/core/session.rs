//! Map session - drives fetch cadence and owns the map-scoped caches
//!
//! MapSession ties the snapshot source, the reconcilers, and the rendering
//! surface together. It is updated once per loop iteration with the current
//! time; every request it issues carries the session generation, and any
//! response from an older generation is dropped before it touches a cache.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::constants::{
    DEFAULT_MAP_INDEX, DEFAULT_UTC_OFFSET_MINUTES, EMPHASIS_DURATION, ENTITY_UPDATE_INTERVAL,
    MAP_RETRY_INTERVAL, MARKER_SLIDE_DURATION, ZONE_NAME_MAX_CHARS, ZONE_UPDATE_INTERVAL,
};
use crate::core::entity_reconciler::reconcile_entities;
use crate::core::error::{ViewerError, ViewerResult};
use crate::core::format::format_timestamp;
use crate::core::io_traits::{FetchPayload, FetchRequest, FetchResponse, FetchTag, SnapshotSource};
use crate::core::markers::{MarkerDirective, MarkerEvent, PopupAction};
use crate::core::protocol::{EntityRecord, MapRecord, ZoneRecord};
use crate::core::traits::{MapSurface, MarkerStyle};
use crate::core::types::{CachedEntity, EntityCache, MapInfo, MapView};
use crate::core::zone_reconciler::{reconcile_zone_counts, BlinkScheduler, ZoneCache};

// =============================================================================
// SETTINGS
// =============================================================================

/// Tunables the session reads from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub entity_interval: Duration,
    pub zone_interval: Duration,
    pub map_retry_interval: Duration,
    pub emphasis: Duration,
    pub marker_slide: Duration,
    pub utc_offset_minutes: i32,
    pub zone_name_max_chars: usize,
    pub marker_style: MarkerStyle,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            entity_interval: ENTITY_UPDATE_INTERVAL,
            zone_interval: ZONE_UPDATE_INTERVAL,
            map_retry_interval: MAP_RETRY_INTERVAL,
            emphasis: EMPHASIS_DURATION,
            marker_slide: MARKER_SLIDE_DURATION,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            zone_name_max_chars: ZONE_NAME_MAX_CHARS,
            marker_style: MarkerStyle::default(),
        }
    }
}

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Lifecycle of the active map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No map list yet (or the last load failed)
    #[default]
    Uninitialized,
    /// Map list requested
    MapLoading,
    /// A map is displayed and polled
    MapActive,
    /// A different map was activated and its zone list is pending
    MapSwitching,
}

/// Events emitted by MapSession for logging and UI updates
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Map list arrived; `added` maps were new
    MapsLoaded { added: usize, total: usize },
    /// A map became active
    MapActivated { map_id: String },
    /// Zone list loaded and the zone panel shown
    ZonesLoaded { map_id: String, zones: usize },
    /// An entity snapshot was reconciled
    EntitiesUpdated { entities: usize, directives: usize },
    /// Zone counts were reconciled
    ZoneCountsUpdated { changed: usize, skipped: usize },
    /// A response from a previous generation was dropped
    StaleResponse { request: FetchRequest, generation: u64 },
    /// A request failed; the next scheduled tick retries
    FetchFailed { request: FetchRequest, error: String },
}

// =============================================================================
// MAP SESSION
// =============================================================================

/// MapSession owns everything scoped to the active map
///
/// Activation of a map:
/// 1. Invalidates in-flight responses by bumping the generation
/// 2. Tears down markers, zone panel, caches, and blink state
/// 3. Shows the floor plan and requests the zone list and entities
/// 4. Starts entity polling; zone polling starts once the zone list loads
pub struct MapSession {
    settings: SessionSettings,
    phase: SessionPhase,
    /// Known maps, append-only
    maps: Vec<MapInfo>,
    active_map: Option<MapInfo>,
    view: Option<MapView>,
    generation: u64,
    entities: EntityCache,
    zones: Option<ZoneCache>,
    blink: BlinkScheduler,
    next_entity_refresh: Option<Instant>,
    next_zone_refresh: Option<Instant>,
    next_map_retry: Option<Instant>,
    last_update: Option<String>,
}

impl MapSession {
    pub fn new(settings: SessionSettings) -> Self {
        let blink = BlinkScheduler::new(settings.emphasis);
        Self {
            settings,
            phase: SessionPhase::Uninitialized,
            maps: Vec::new(),
            active_map: None,
            view: None,
            generation: 0,
            entities: EntityCache::new(),
            zones: None,
            blink,
            next_entity_refresh: None,
            next_zone_refresh: None,
            next_map_retry: None,
            last_update: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn maps(&self) -> &[MapInfo] {
        &self.maps
    }

    pub fn active_map(&self) -> Option<&MapInfo> {
        self.active_map.as_ref()
    }

    pub fn active_map_id(&self) -> Option<&str> {
        self.active_map.as_ref().map(|m| m.id.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entities(&self) -> &EntityCache {
        &self.entities
    }

    pub fn zones(&self) -> Option<&ZoneCache> {
        self.zones.as_ref()
    }

    pub fn is_zone_highlighted(&self, zone_id: &str) -> bool {
        self.blink.is_highlighted(zone_id)
    }

    /// Text of the "last data update" label
    pub fn last_update(&self) -> Option<&str> {
        self.last_update.as_deref()
    }

    fn tag(&self, request: FetchRequest) -> FetchTag {
        FetchTag::new(self.generation, request)
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Request the map list
    pub fn load_maps<S: SnapshotSource>(&mut self, source: &mut S) {
        info!("[SESSION] Loading map list");
        if self.active_map.is_none() {
            self.phase = SessionPhase::MapLoading;
        }
        self.next_map_retry = None;
        source.request(self.tag(FetchRequest::Maps));
    }

    /// Make `map_id` the active map
    ///
    /// Returns `NotFound` if the map is not in the known list.
    pub fn activate_map<S: SnapshotSource, M: MapSurface>(
        &mut self,
        map_id: &str,
        now: Instant,
        source: &mut S,
        surface: &mut M,
    ) -> ViewerResult<()> {
        let map = self
            .maps
            .iter()
            .find(|m| m.id == map_id)
            .cloned()
            .ok_or_else(|| ViewerError::not_found("map", map_id))?;

        let switching = self.active_map.is_some();
        self.generation += 1;
        self.next_entity_refresh = None;
        self.next_zone_refresh = None;

        if self.zones.take().is_some() {
            surface.remove_zone_panel();
        }
        for id in self.entities.marker_ids() {
            surface.remove_marker(&id);
        }
        self.entities = EntityCache::new();
        self.blink.clear();

        let bounds = map.bounds();
        surface.set_image_overlay(&map.image_uri(), bounds);
        surface.fit_bounds(bounds);

        info!(
            map_id = %map.id,
            name = %map.name,
            width = map.width,
            height = map.height,
            generation = self.generation,
            "[SESSION] Activating map"
        );

        self.view = Some(MapView::new(map.id.clone(), bounds));
        self.active_map = Some(map);
        self.phase = if switching {
            SessionPhase::MapSwitching
        } else {
            SessionPhase::MapActive
        };

        source.request(self.tag(FetchRequest::Zones {
            map_id: map_id.to_string(),
        }));
        self.refresh_entities(source)?;
        self.next_entity_refresh = Some(now + self.settings.entity_interval);
        Ok(())
    }

    /// Request an entity snapshot for the active map
    pub fn refresh_entities<S: SnapshotSource>(&mut self, source: &mut S) -> ViewerResult<()> {
        if self.active_map.is_none() {
            return Err(ViewerError::state("entity refresh without an active map"));
        }
        source.request(self.tag(FetchRequest::Entities));
        Ok(())
    }

    /// Request zone counts for the active map
    pub fn refresh_zones<S: SnapshotSource>(&mut self, source: &mut S) -> ViewerResult<()> {
        let map_id = self
            .active_map_id()
            .ok_or_else(|| ViewerError::state("zone refresh without an active map"))?
            .to_string();
        if self.zones.is_none() {
            return Err(ViewerError::state("zone refresh before the zone list loaded"));
        }
        source.request(self.tag(FetchRequest::ZoneCounts { map_id }));
        Ok(())
    }

    /// Advance timers and apply completed responses
    ///
    /// Call every loop iteration. Returns the events that occurred.
    pub fn update<S: SnapshotSource, M: MapSurface>(
        &mut self,
        now: Instant,
        source: &mut S,
        surface: &mut M,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if self.phase == SessionPhase::Uninitialized
            && self.next_map_retry.map_or(true, |at| now >= at)
        {
            self.load_maps(source);
        }

        while let Some(response) = source.poll_response() {
            self.handle_response(response, now, source, surface, &mut events);
        }

        if self.next_entity_refresh.is_some_and(|at| now >= at) {
            self.next_entity_refresh = Some(now + self.settings.entity_interval);
            if let Err(e) = self.refresh_entities(source) {
                warn!(error = %e, "[SESSION] Entity refresh skipped");
            }
        }

        if self.next_zone_refresh.is_some_and(|at| now >= at) {
            self.next_zone_refresh = Some(now + self.settings.zone_interval);
            if let Err(e) = self.refresh_zones(source) {
                warn!(error = %e, "[SESSION] Zone refresh skipped");
            }
        }

        for change in self.blink.tick(now) {
            if let Err(e) = surface.set_zone_highlight(&change.zone_id, change.highlighted) {
                warn!(zone_id = %change.zone_id, error = %e, "[ZONES] Cannot update highlight");
            }
        }

        events
    }

    // -------------------------------------------------------------------------
    // Marker interaction
    // -------------------------------------------------------------------------

    /// Route a pointer/popup event from the surface to the marker's state
    /// machine. Only one popup is open at a time.
    pub fn handle_marker_event<M: MapSurface>(
        &mut self,
        entity_id: &str,
        event: MarkerEvent,
        surface: &mut M,
    ) -> ViewerResult<()> {
        let marker = self
            .entities
            .get_mut(entity_id)
            .and_then(|e| e.marker.as_mut())
            .ok_or_else(|| ViewerError::not_found("marker", entity_id))?;

        match marker.handle_event(event) {
            PopupAction::Open => {
                self.close_other_popups(entity_id, surface);
                surface.open_popup(entity_id);
            }
            PopupAction::Close => {
                surface.close_popup(entity_id);
                self.sync_popup_card(entity_id, surface);
            }
            PopupAction::Nothing => {
                if event == MarkerEvent::PopupClosed {
                    self.sync_popup_card(entity_id, surface);
                }
            }
        }
        Ok(())
    }

    /// Open a marker popup transiently, as a search result selection does
    pub fn open_popup<M: MapSurface>(&mut self, entity_id: &str, surface: &mut M) -> ViewerResult<()> {
        self.handle_marker_event(entity_id, MarkerEvent::HoverStart, surface)
    }

    fn close_other_popups<M: MapSurface>(&mut self, keep: &str, surface: &mut M) {
        for entity in self.entities.iter_mut() {
            if entity.id == keep || !entity.marker.as_ref().is_some_and(|m| m.is_popup_open()) {
                continue;
            }
            if let Some(marker) = entity.marker.as_mut() {
                marker.handle_event(MarkerEvent::PopupClosed);
            }
            surface.close_popup(&entity.id);
            push_deferred_card(entity, surface);
        }
    }

    fn sync_popup_card<M: MapSurface>(&mut self, entity_id: &str, surface: &mut M) {
        if let Some(entity) = self.entities.get_mut(entity_id) {
            push_deferred_card(entity, surface);
        }
    }

    // -------------------------------------------------------------------------
    // Responses
    // -------------------------------------------------------------------------

    fn handle_response<S: SnapshotSource, M: MapSurface>(
        &mut self,
        response: FetchResponse,
        now: Instant,
        source: &mut S,
        surface: &mut M,
        events: &mut Vec<SessionEvent>,
    ) {
        let FetchResponse { tag, result } = response;

        if tag.generation != self.generation {
            debug!(
                request = %tag.request,
                generation = tag.generation,
                current = self.generation,
                "[FETCH] Dropping stale response"
            );
            events.push(SessionEvent::StaleResponse {
                request: tag.request,
                generation: tag.generation,
            });
            return;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!(request = %tag.request, error = %e, "[FETCH] Request failed");
                match &tag.request {
                    FetchRequest::Maps => self.schedule_map_retry(now),
                    FetchRequest::Zones { .. } if self.phase == SessionPhase::MapSwitching => {
                        self.phase = SessionPhase::MapActive;
                    }
                    _ => {}
                }
                events.push(SessionEvent::FetchFailed {
                    request: tag.request,
                    error: e.to_string(),
                });
                return;
            }
        };

        match (tag.request, payload) {
            (FetchRequest::Maps, FetchPayload::Maps(records)) => {
                self.apply_maps(records, now, source, surface, events);
            }
            (FetchRequest::Zones { map_id }, FetchPayload::Zones(records)) => {
                self.apply_zone_list(&map_id, &records, now, surface, events);
            }
            (FetchRequest::ZoneCounts { map_id }, FetchPayload::Zones(records)) => {
                self.apply_zone_counts(&map_id, &records, now, surface, events);
            }
            (FetchRequest::Entities, FetchPayload::Entities(records)) => {
                self.apply_entities(records, surface, events);
            }
            (request, _) => {
                warn!(request = %request, "[FETCH] Response payload does not match request");
            }
        }
    }

    fn schedule_map_retry(&mut self, now: Instant) {
        self.phase = SessionPhase::Uninitialized;
        self.next_map_retry = Some(now + self.settings.map_retry_interval);
    }

    fn apply_maps<S: SnapshotSource, M: MapSurface>(
        &mut self,
        records: Vec<MapRecord>,
        now: Instant,
        source: &mut S,
        surface: &mut M,
        events: &mut Vec<SessionEvent>,
    ) {
        let before = self.maps.len();
        for record in records {
            if self.maps.iter().any(|m| m.id == record.id) {
                continue;
            }
            self.maps.push(MapInfo::from(record));
        }
        let added = self.maps.len() - before;
        info!(added, total = self.maps.len(), "[SESSION] Map list loaded");
        events.push(SessionEvent::MapsLoaded {
            added,
            total: self.maps.len(),
        });

        if self.active_map.is_some() {
            return;
        }

        let Some(map_id) = self.maps.get(DEFAULT_MAP_INDEX).map(|m| m.id.clone()) else {
            warn!("[SESSION] Map list is empty, retrying");
            self.schedule_map_retry(now);
            return;
        };

        match self.activate_map(&map_id, now, source, surface) {
            Ok(()) => events.push(SessionEvent::MapActivated { map_id }),
            Err(e) => {
                warn!(map_id = %map_id, error = %e, "[SESSION] Cannot activate default map");
                self.schedule_map_retry(now);
            }
        }
    }

    fn apply_zone_list<M: MapSurface>(
        &mut self,
        map_id: &str,
        records: &[ZoneRecord],
        now: Instant,
        surface: &mut M,
        events: &mut Vec<SessionEvent>,
    ) {
        if self.active_map_id() != Some(map_id) {
            debug!(map_id, "[ZONES] Zone list for inactive map, dropping");
            return;
        }

        let (cache, rows) = ZoneCache::load(map_id, records, self.settings.zone_name_max_chars);
        surface.show_zone_panel(&rows);
        info!(map_id, zones = cache.len(), "[ZONES] Zone list loaded");
        events.push(SessionEvent::ZonesLoaded {
            map_id: map_id.to_string(),
            zones: cache.len(),
        });

        self.zones = Some(cache);
        self.phase = SessionPhase::MapActive;
        self.next_zone_refresh = Some(now + self.settings.zone_interval);
    }

    fn apply_zone_counts<M: MapSurface>(
        &mut self,
        map_id: &str,
        records: &[ZoneRecord],
        now: Instant,
        surface: &mut M,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(zones) = self.zones.as_mut().filter(|z| z.map_id() == map_id) else {
            debug!(map_id, "[ZONES] Zone counts without a loaded zone list, dropping");
            return;
        };

        let outcome = reconcile_zone_counts(zones, records);
        let mut applied = 0;
        let mut skipped = outcome.skipped.len();

        for change in &outcome.changes {
            debug!(
                zone_id = %change.zone_id,
                previous = change.previous,
                count = change.count,
                "[ZONES] Count changed"
            );
            // Cache keeps the displayed count, so an undisplayed change retries next poll
            if let Err(e) = surface.set_zone_count(&change.zone_id, change.count) {
                warn!(zone_id = %change.zone_id, error = %e, "[ZONES] Cannot update count, skipping");
                skipped += 1;
                continue;
            }
            zones.commit(&change.zone_id, change.count);
            applied += 1;

            let highlight = self.blink.trigger(&change.zone_id, now);
            if let Err(e) = surface.set_zone_highlight(&highlight.zone_id, highlight.highlighted) {
                warn!(zone_id = %highlight.zone_id, error = %e, "[ZONES] Cannot update highlight");
            }
        }

        events.push(SessionEvent::ZoneCountsUpdated {
            changed: applied,
            skipped,
        });
    }

    fn apply_entities<M: MapSurface>(
        &mut self,
        records: Vec<EntityRecord>,
        surface: &mut M,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(view) = self.view.as_ref() else {
            debug!("[SESSION] Entity snapshot without an active map, dropping");
            return;
        };

        let outcome = reconcile_entities(
            &self.entities,
            records,
            view,
            self.settings.utc_offset_minutes,
        );

        for directive in &outcome.directives {
            apply_directive(directive, &self.settings, surface);
        }

        let directives = outcome.directives.len();
        self.entities = outcome.cache;

        let stamp = format_timestamp(Utc::now(), self.settings.utc_offset_minutes);
        if let Err(e) = surface.set_last_update(&stamp) {
            warn!(error = %e, "[SESSION] Cannot update last-update label");
        }
        self.last_update = Some(stamp);

        debug!(
            entities = self.entities.len(),
            directives, "[SESSION] Entities reconciled"
        );
        events.push(SessionEvent::EntitiesUpdated {
            entities: self.entities.len(),
            directives,
        });
    }
}

/// Bind the entity's current card to its marker once the popup is closed
fn push_deferred_card<M: MapSurface>(entity: &mut CachedEntity, surface: &mut M) {
    let card = entity.card();
    let Some(marker) = entity.marker.as_mut() else {
        return;
    };
    if marker.is_popup_open() || marker.bound_card == card {
        return;
    }
    surface.set_popup_content(&entity.id, &card);
    marker.bound_card = card;
}

fn apply_directive<M: MapSurface>(
    directive: &MarkerDirective,
    settings: &SessionSettings,
    surface: &mut M,
) {
    match directive {
        MarkerDirective::CreateMarker {
            entity_id,
            point,
            tooltip,
            card,
        } => surface.create_marker(entity_id, *point, tooltip, card, &settings.marker_style),
        MarkerDirective::MoveMarker { entity_id, point } => {
            surface.slide_marker(entity_id, *point, settings.marker_slide)
        }
        MarkerDirective::UpdateTooltip { entity_id, tooltip } => {
            surface.set_tooltip(entity_id, tooltip)
        }
        MarkerDirective::UpdatePopupContent { entity_id, card } => {
            surface.set_popup_content(entity_id, card)
        }
        MarkerDirective::RemoveMarker { entity_id } => surface.remove_marker(entity_id),
    }
}

// =============================================================================
// TESTS
// =============================================================================
