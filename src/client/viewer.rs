//! Viewer - main orchestrator for the floor map viewer
//!
//! Owns the map session, the search/menu overlay, the snapshot source and
//! the rendering surface. The front end calls `update()` once per loop
//! iteration and forwards user input to the matching handler; overlay
//! actions are routed back into the session and the surface here.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::io_traits::SnapshotSource;
use crate::core::markers::MarkerEvent;
use crate::core::overlay::{Overlay, OverlayAction};
use crate::core::session::{MapSession, SessionEvent, SessionPhase};
use crate::core::traits::MapSurface;

use super::config::ViewerConfig;

// =============================================================================
// VIEWER
// =============================================================================

pub struct Viewer<S, M> {
    session: MapSession,
    overlay: Overlay,
    source: S,
    surface: M,
}

impl<S: SnapshotSource, M: MapSurface> Viewer<S, M> {
    pub fn new(config: &ViewerConfig, source: S, surface: M) -> Self {
        info!(base_url = %config.service.base_url, "[VIEWER] Initializing");
        Self {
            session: MapSession::new(config.session_settings()),
            overlay: Overlay::new(config.search_debounce(), config.refresh.page_size),
            source,
            surface,
        }
    }

    pub fn session(&self) -> &MapSession {
        &self.session
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// Advance the session and the overlay timers, then redraw the overlay
    pub fn update(&mut self, now: Instant) -> Vec<SessionEvent> {
        let events = self
            .session
            .update(now, &mut self.source, &mut self.surface);
        for event in &events {
            log_session_event(event);
        }

        let actions = self.overlay.tick(now, self.session.entities());
        self.apply_actions(actions, now);
        self.render_overlay();
        events
    }

    // -------------------------------------------------------------------------
    // Search input
    // -------------------------------------------------------------------------

    /// Key released in the search input; `text` is the input content after
    /// the key took effect
    pub fn key_up(&mut self, key_code: u32, text: &str, now: Instant) {
        self.overlay
            .key_up(key_code, text, now, self.session.entities());
        self.render_overlay();
    }

    pub fn focus(&mut self) {
        self.overlay.focus(self.session.entities());
        self.render_overlay();
    }

    pub fn blur(&mut self) {
        self.overlay.blur();
        self.render_overlay();
    }

    // -------------------------------------------------------------------------
    // Buttons
    // -------------------------------------------------------------------------

    pub fn search_button(&mut self) {
        self.overlay.search_button(self.session.entities());
        self.render_overlay();
    }

    pub fn clear_button(&mut self, now: Instant) {
        let actions = self.overlay.clear_button();
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    pub fn menu_button(&mut self, now: Instant) {
        let actions = self.overlay.menu_button();
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    pub fn next_page(&mut self, now: Instant) {
        let actions = self.overlay.next_page();
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    pub fn prev_page(&mut self, now: Instant) {
        let actions = self.overlay.prev_page();
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    pub fn hover_row(&mut self, index: usize, entered: bool) {
        self.overlay.hover_row(index, entered);
        self.render_overlay();
    }

    pub fn press_result(&mut self, index: usize, now: Instant) {
        let actions = self.overlay.press_result(index, self.session.entities());
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    pub fn press_menu(&mut self, index: usize, now: Instant) {
        let actions =
            self.overlay
                .press_menu(index, self.session.maps(), self.session.active_map_id());
        self.apply_actions(actions, now);
        self.render_overlay();
    }

    // -------------------------------------------------------------------------
    // Markers
    // -------------------------------------------------------------------------

    /// Pointer or popup event on a marker
    pub fn marker_event(&mut self, entity_id: &str, event: MarkerEvent) {
        if let Err(e) = self
            .session
            .handle_marker_event(entity_id, event, &mut self.surface)
        {
            debug!(entity_id, event = ?event, error = %e, "[VIEWER] Marker event ignored");
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn apply_actions(&mut self, actions: Vec<OverlayAction>, now: Instant) {
        for action in actions {
            match action {
                OverlayAction::OpenMarkerPopup { entity_id } => {
                    if let Err(e) = self.session.open_popup(&entity_id, &mut self.surface) {
                        warn!(entity_id = %entity_id, error = %e, "[VIEWER] Cannot open popup");
                    }
                }
                OverlayAction::SwitchMap { map_id } => {
                    info!(map_id = %map_id, "[VIEWER] Switching map");
                    if let Err(e) =
                        self.session
                            .activate_map(&map_id, now, &mut self.source, &mut self.surface)
                    {
                        warn!(map_id = %map_id, error = %e, "[VIEWER] Cannot switch map");
                    }
                }
                OverlayAction::FocusInput => self.surface.focus_input(),
                OverlayAction::SetInputText(text) => self.surface.set_input_text(&text),
            }
        }
    }

    fn render_overlay(&mut self) {
        let view = self.overlay.view(
            self.session.entities(),
            self.session.maps(),
            self.session.active_map_id(),
        );
        match view {
            Some(view) => self.surface.render_overlay(&view),
            None => self.surface.hide_overlay(),
        }
    }
}

fn log_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::MapsLoaded { added, total } => {
            info!(added, total, "[VIEWER] Map list loaded");
        }
        SessionEvent::MapActivated { map_id } => {
            info!(map_id = %map_id, "[VIEWER] Map active");
        }
        SessionEvent::ZonesLoaded { map_id, zones } => {
            info!(map_id = %map_id, zones, "[VIEWER] Zone panel ready");
        }
        SessionEvent::EntitiesUpdated {
            entities,
            directives,
        } => {
            debug!(entities, directives, "[VIEWER] Entities updated");
        }
        SessionEvent::ZoneCountsUpdated { changed, skipped } => {
            debug!(changed, skipped, "[VIEWER] Zone counts updated");
        }
        SessionEvent::StaleResponse {
            request,
            generation,
        } => {
            debug!(request = %request, generation, "[VIEWER] Stale response dropped");
        }
        SessionEvent::FetchFailed { request, error } => {
            warn!(request = %request, error = %error, "[VIEWER] Fetch failed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io_traits::mocks::MockSnapshotSource;
    use crate::core::io_traits::{FetchPayload, FetchRequest};
    use crate::core::markers::PopupOpenReason;
    use crate::core::overlay::{OverlayMode, OverlayView};
    use crate::core::protocol::{EntityRecord, MapRecord};
    use crate::core::traits::mocks::{RecordingSurface, SurfaceCall};
    use std::time::Duration;

    fn map(id: &str, name: &str) -> MapRecord {
        MapRecord {
            id: id.to_string(),
            name: name.to_string(),
            width: 100.0,
            height: 50.0,
        }
    }

    fn entity(id: &str, name: &str, map_id: &str) -> EntityRecord {
        EntityRecord {
            id: id.to_string(),
            map_id: map_id.to_string(),
            x: 10.0,
            y: 10.0,
            last_seen_epoch_seconds: 1_700_000_000,
            zone_name: None,
            display_name: name.to_string(),
            display_org: "Ops".to_string(),
        }
    }

    struct Harness {
        viewer: Viewer<MockSnapshotSource, RecordingSurface>,
        start: Instant,
    }

    impl Harness {
        /// Maps [M, N] loaded, M active, entities alice (on M) and bob (on N)
        fn new() -> Self {
            let viewer = Viewer::new(
                &ViewerConfig::default(),
                MockSnapshotSource::new(),
                RecordingSurface::new(),
            );
            let mut h = Self {
                viewer,
                start: Instant::now(),
            };
            h.update_at(0);
            h.viewer.source().complete(
                &FetchRequest::Maps,
                FetchPayload::Maps(vec![map("M", "Ground"), map("N", "Upper")]),
            );
            h.update_at(0);
            h.viewer.source().complete(
                &FetchRequest::Entities,
                FetchPayload::Entities(vec![
                    entity("alice", "Alice", "M"),
                    entity("bob", "Bob", "N"),
                ]),
            );
            h.update_at(0);
            h.viewer.surface().clear_calls();
            h
        }

        fn at(&self, ms: u64) -> Instant {
            self.start + Duration::from_millis(ms)
        }

        fn update_at(&mut self, ms: u64) -> Vec<SessionEvent> {
            let now = self.at(ms);
            self.viewer.update(now)
        }

        fn last_view(&self) -> Option<OverlayView> {
            self.viewer
                .surface()
                .calls
                .borrow()
                .iter()
                .rev()
                .find_map(|c| match c {
                    SurfaceCall::RenderOverlay(view) => Some(Some(view.clone())),
                    SurfaceCall::HideOverlay => Some(None),
                    _ => None,
                })
                .flatten()
        }
    }

    #[test]
    fn test_startup_activates_first_map() {
        let h = Harness::new();
        assert_eq!(h.viewer.phase(), SessionPhase::MapActive);
        assert_eq!(h.viewer.session().active_map_id(), Some("M"));
        assert!(h.viewer.surface().has_marker("alice"));
        assert!(!h.viewer.surface().has_marker("bob"));
    }

    #[test]
    fn test_debounced_search_renders_results() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(u32::from(b'A'), "al", now);
        assert!(h.viewer.overlay().has_pending_search());
        assert_eq!(h.viewer.overlay().mode(), OverlayMode::Closed);

        h.update_at(450);
        assert_eq!(h.viewer.overlay().mode(), OverlayMode::Results);
        match h.last_view() {
            Some(OverlayView::Results { rows, .. }) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].entity_id, "alice");
            }
            other => panic!("Expected results, got {:?}", other),
        }
    }

    #[test]
    fn test_enter_searches_immediately() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(13, "zed", now);
        assert!(!h.viewer.overlay().has_pending_search());
        match h.last_view() {
            Some(OverlayView::NoResults { message }) => {
                assert_eq!(message, "No result for \"zed\"")
            }
            other => panic!("Expected no results, got {:?}", other),
        }
    }

    #[test]
    fn test_selecting_result_opens_popup() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(13, "alice", now);
        h.viewer.press_result(0, now);

        assert_eq!(
            h.viewer
                .session()
                .entities()
                .get("alice")
                .and_then(|e| e.marker.as_ref())
                .map(|m| m.popup),
            Some(PopupOpenReason::Hover)
        );
        assert_eq!(
            h.viewer
                .surface()
                .count(|c| *c == SurfaceCall::OpenPopup("alice".to_string())),
            1
        );
        assert_eq!(h.viewer.overlay().active_row(), Some(0));
    }

    #[test]
    fn test_offline_result_is_inert() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(13, "bob", now);
        h.viewer.press_result(0, now);
        assert_eq!(
            h.viewer
                .surface()
                .count(|c| matches!(c, SurfaceCall::OpenPopup(_))),
            0
        );
    }

    #[test]
    fn test_menu_switches_map() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.menu_button(now);
        match h.last_view() {
            Some(OverlayView::Menu { rows }) => {
                assert_eq!(rows.len(), 2);
                assert!(rows[0].active);
                assert_eq!(rows[1].title, "Switch Map: Upper");
            }
            other => panic!("Expected menu, got {:?}", other),
        }

        // Active map is a no-op
        h.viewer.press_menu(0, now);
        assert_eq!(h.viewer.overlay().mode(), OverlayMode::Menu);

        h.viewer.press_menu(1, now);
        assert_eq!(h.viewer.session().active_map_id(), Some("N"));
        assert_eq!(h.viewer.phase(), SessionPhase::MapSwitching);
        assert_eq!(h.viewer.overlay().mode(), OverlayMode::Closed);
        assert!(!h.viewer.surface().has_marker("alice"));
        assert_eq!(h.last_view(), None);
    }

    #[test]
    fn test_clear_button_resets_input() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(13, "alice", now);
        h.viewer.clear_button(now);
        assert_eq!(h.viewer.overlay().mode(), OverlayMode::Closed);
        assert_eq!(
            h.viewer
                .surface()
                .count(|c| *c == SurfaceCall::SetInputText(String::new())),
            1
        );
        assert_eq!(h.last_view(), None);
    }

    #[test]
    fn test_blur_hides_and_focus_restores() {
        let mut h = Harness::new();
        let now = h.at(100);
        h.viewer.key_up(13, "alice", now);
        h.viewer.blur();
        assert_eq!(h.last_view(), None);
        h.viewer.focus();
        assert!(matches!(h.last_view(), Some(OverlayView::Results { .. })));
    }

    #[test]
    fn test_marker_event_on_unknown_marker_is_ignored() {
        let mut h = Harness::new();
        h.viewer.marker_event("bob", MarkerEvent::Click);
        h.viewer.marker_event("alice", MarkerEvent::Click);
        assert_eq!(
            h.viewer
                .surface()
                .count(|c| matches!(c, SurfaceCall::OpenPopup(_))),
            1
        );
    }
}
