//! Core traits - the rendering surface the session and overlay draw on
//!
//! The actual implementation lives with the front end (a map widget, a
//! browser bridge, or the headless `client::log_surface`). For testing,
//! `mocks::RecordingSurface` records every call.

use std::time::Duration;

use super::color::parse_hex_color;
use super::constants::{MARKER_COLOR, MARKER_OPACITY, MARKER_RADIUS};
use super::error::ViewerResult;
use super::markers::PopupCard;
use super::overlay::OverlayView;
use super::types::{MapBounds, PlotPoint};
use super::zone_reconciler::ZonePanelRow;

// =============================================================================
// MARKER STYLE
// =============================================================================

/// Appearance of entity markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    /// RGBA fill color in [0.0, 1.0]
    pub color: [f32; 4],
    /// Dot diameter in pixels
    pub radius: u32,
}

impl MarkerStyle {
    pub fn new(hex_color: &str, opacity: f32, radius: u32) -> Self {
        Self {
            color: parse_hex_color(hex_color, opacity),
            radius,
        }
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self::new(MARKER_COLOR, MARKER_OPACITY, MARKER_RADIUS)
    }
}

// =============================================================================
// MAP SURFACE
// =============================================================================

/// Rendering capability of the map widget
///
/// Marker operations address markers by entity id. Panel and label
/// operations fail with `ViewerError::NotFound` when their render target is
/// missing; callers log and carry on.
pub trait MapSurface {
    fn create_marker(
        &mut self,
        entity_id: &str,
        point: PlotPoint,
        tooltip: &str,
        card: &PopupCard,
        style: &MarkerStyle,
    );

    fn remove_marker(&mut self, entity_id: &str);

    /// Animate a marker to a new position over `duration`
    fn slide_marker(&mut self, entity_id: &str, to: PlotPoint, duration: Duration);

    /// Replace the permanent label under a marker
    fn set_tooltip(&mut self, entity_id: &str, tooltip: &str);

    /// Rebind the popup card of a marker
    fn set_popup_content(&mut self, entity_id: &str, card: &PopupCard);

    fn open_popup(&mut self, entity_id: &str);

    fn close_popup(&mut self, entity_id: &str);

    /// Show the floor-plan image stretched over `bounds`
    fn set_image_overlay(&mut self, image_uri: &str, bounds: MapBounds);

    /// Restrict panning to `bounds` and zoom to fit them
    fn fit_bounds(&mut self, bounds: MapBounds);

    fn show_zone_panel(&mut self, rows: &[ZonePanelRow]);

    fn remove_zone_panel(&mut self);

    fn set_zone_count(&mut self, zone_id: &str, count: i64) -> ViewerResult<()>;

    fn set_zone_highlight(&mut self, zone_id: &str, highlighted: bool) -> ViewerResult<()>;

    /// Update the "last data update" label
    fn set_last_update(&mut self, text: &str) -> ViewerResult<()>;

    /// Show the search/menu drop-down
    fn render_overlay(&mut self, view: &OverlayView);

    fn hide_overlay(&mut self);

    fn focus_input(&mut self);

    fn set_input_text(&mut self, text: &str);
}

// =============================================================================
// MOCK IMPLEMENTATIONS FOR TESTING
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::core::error::ViewerError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// A recorded surface call
    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        CreateMarker { entity_id: String, point: PlotPoint },
        RemoveMarker(String),
        SlideMarker { entity_id: String, to: PlotPoint },
        SetTooltip { entity_id: String, tooltip: String },
        SetPopupContent { entity_id: String, card: PopupCard },
        OpenPopup(String),
        ClosePopup(String),
        SetImageOverlay(String),
        FitBounds(MapBounds),
        ShowZonePanel(Vec<ZonePanelRow>),
        RemoveZonePanel,
        SetZoneCount { zone_id: String, count: i64 },
        SetZoneHighlight { zone_id: String, highlighted: bool },
        SetLastUpdate(String),
        RenderOverlay(OverlayView),
        HideOverlay,
        FocusInput,
        SetInputText(String),
    }

    /// Mock surface for testing
    ///
    /// Records every call in order and tracks the live marker set and the
    /// zone panel so missing render targets fail like the real thing.
    pub struct RecordingSurface {
        pub calls: RefCell<Vec<SurfaceCall>>,
        /// Live markers and their current position
        pub markers: RefCell<HashMap<String, PlotPoint>>,
        /// Zone ids of the panel currently shown, `None` when no panel
        pub panel: RefCell<Option<Vec<String>>>,
        /// Whether the last-update label exists
        pub has_label: RefCell<bool>,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                markers: RefCell::new(HashMap::new()),
                panel: RefCell::new(None),
                has_label: RefCell::new(true),
            }
        }

        /// Surface without the last-update label
        pub fn without_label() -> Self {
            let surface = Self::new();
            *surface.has_label.borrow_mut() = false;
            surface
        }

        fn record(&self, call: SurfaceCall) {
            self.calls.borrow_mut().push(call);
        }

        /// Number of recorded calls matching `f`
        pub fn count<F: Fn(&SurfaceCall) -> bool>(&self, f: F) -> usize {
            self.calls.borrow().iter().filter(|c| f(c)).count()
        }

        pub fn marker_count(&self) -> usize {
            self.markers.borrow().len()
        }

        pub fn has_marker(&self, entity_id: &str) -> bool {
            self.markers.borrow().contains_key(entity_id)
        }

        pub fn last_call(&self) -> Option<SurfaceCall> {
            self.calls.borrow().last().cloned()
        }

        pub fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }

        fn panel_has(&self, zone_id: &str) -> bool {
            self.panel
                .borrow()
                .as_ref()
                .is_some_and(|zones| zones.iter().any(|z| z == zone_id))
        }
    }

    impl Default for RecordingSurface {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MapSurface for RecordingSurface {
        fn create_marker(
            &mut self,
            entity_id: &str,
            point: PlotPoint,
            _tooltip: &str,
            _card: &PopupCard,
            _style: &MarkerStyle,
        ) {
            self.markers.borrow_mut().insert(entity_id.to_string(), point);
            self.record(SurfaceCall::CreateMarker {
                entity_id: entity_id.to_string(),
                point,
            });
        }

        fn remove_marker(&mut self, entity_id: &str) {
            self.markers.borrow_mut().remove(entity_id);
            self.record(SurfaceCall::RemoveMarker(entity_id.to_string()));
        }

        fn slide_marker(&mut self, entity_id: &str, to: PlotPoint, _duration: Duration) {
            self.markers.borrow_mut().insert(entity_id.to_string(), to);
            self.record(SurfaceCall::SlideMarker {
                entity_id: entity_id.to_string(),
                to,
            });
        }

        fn set_tooltip(&mut self, entity_id: &str, tooltip: &str) {
            self.record(SurfaceCall::SetTooltip {
                entity_id: entity_id.to_string(),
                tooltip: tooltip.to_string(),
            });
        }

        fn set_popup_content(&mut self, entity_id: &str, card: &PopupCard) {
            self.record(SurfaceCall::SetPopupContent {
                entity_id: entity_id.to_string(),
                card: card.clone(),
            });
        }

        fn open_popup(&mut self, entity_id: &str) {
            self.record(SurfaceCall::OpenPopup(entity_id.to_string()));
        }

        fn close_popup(&mut self, entity_id: &str) {
            self.record(SurfaceCall::ClosePopup(entity_id.to_string()));
        }

        fn set_image_overlay(&mut self, image_uri: &str, _bounds: MapBounds) {
            self.record(SurfaceCall::SetImageOverlay(image_uri.to_string()));
        }

        fn fit_bounds(&mut self, bounds: MapBounds) {
            self.record(SurfaceCall::FitBounds(bounds));
        }

        fn show_zone_panel(&mut self, rows: &[ZonePanelRow]) {
            *self.panel.borrow_mut() = Some(rows.iter().map(|r| r.zone_id.clone()).collect());
            self.record(SurfaceCall::ShowZonePanel(rows.to_vec()));
        }

        fn remove_zone_panel(&mut self) {
            *self.panel.borrow_mut() = None;
            self.record(SurfaceCall::RemoveZonePanel);
        }

        fn set_zone_count(&mut self, zone_id: &str, count: i64) -> ViewerResult<()> {
            if !self.panel_has(zone_id) {
                return Err(ViewerError::not_found("zone panel row", zone_id));
            }
            self.record(SurfaceCall::SetZoneCount {
                zone_id: zone_id.to_string(),
                count,
            });
            Ok(())
        }

        fn set_zone_highlight(&mut self, zone_id: &str, highlighted: bool) -> ViewerResult<()> {
            if !self.panel_has(zone_id) {
                return Err(ViewerError::not_found("zone panel row", zone_id));
            }
            self.record(SurfaceCall::SetZoneHighlight {
                zone_id: zone_id.to_string(),
                highlighted,
            });
            Ok(())
        }

        fn set_last_update(&mut self, text: &str) -> ViewerResult<()> {
            if !*self.has_label.borrow() {
                return Err(ViewerError::not_found("label", "last-update"));
            }
            self.record(SurfaceCall::SetLastUpdate(text.to_string()));
            Ok(())
        }

        fn render_overlay(&mut self, view: &OverlayView) {
            self.record(SurfaceCall::RenderOverlay(view.clone()));
        }

        fn hide_overlay(&mut self) {
            self.record(SurfaceCall::HideOverlay);
        }

        fn focus_input(&mut self) {
            self.record(SurfaceCall::FocusInput);
        }

        fn set_input_text(&mut self, text: &str) {
            self.record(SurfaceCall::SetInputText(text.to_string()));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;

    #[test]
    fn test_marker_style_default() {
        let style = MarkerStyle::default();
        assert_eq!(style.color, [0.0, 0.0, 1.0, 0.6]);
        assert_eq!(style.radius, 15);
    }

    #[test]
    fn test_marker_style_from_hex() {
        let style = MarkerStyle::new("#FF0000", 1.0, 8);
        assert_eq!(style.color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_recording_surface_tracks_markers() {
        let mut surface = RecordingSurface::new();
        let style = MarkerStyle::default();
        surface.create_marker("a", PlotPoint::new(1.0, 2.0), "A", &PopupCard::default(), &style);
        surface.slide_marker("a", PlotPoint::new(3.0, 4.0), Duration::from_millis(500));
        assert!(surface.has_marker("a"));
        assert_eq!(
            surface.markers.borrow().get("a").copied(),
            Some(PlotPoint::new(3.0, 4.0))
        );
        surface.remove_marker("a");
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn test_recording_surface_missing_targets() {
        let mut surface = RecordingSurface::without_label();
        assert!(surface.set_zone_count("A", 1).is_err());
        assert!(surface.set_last_update("now").is_err());

        surface.show_zone_panel(&[ZonePanelRow {
            zone_id: "A".to_string(),
            name: "Lobby".to_string(),
            count: 0,
        }]);
        assert!(surface.set_zone_count("A", 1).is_ok());
        assert!(surface.set_zone_highlight("B", true).is_err());

        surface.remove_zone_panel();
        assert!(surface.set_zone_count("A", 2).is_err());
    }
}
