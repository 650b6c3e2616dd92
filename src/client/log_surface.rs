//! Headless map surface
//!
//! `MapSurface` implementation that keeps the minimum render state (live
//! markers, zone panel rows, label text) and reports every change through
//! tracing. Used by the standalone runner and handy when diagnosing a
//! service without a front end attached.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::color::to_css_rgba;
use crate::core::error::{ViewerError, ViewerResult};
use crate::core::markers::PopupCard;
use crate::core::overlay::OverlayView;
use crate::core::traits::{MapSurface, MarkerStyle};
use crate::core::types::{MapBounds, PlotPoint};
use crate::core::zone_reconciler::ZonePanelRow;

/// Surface that renders to the log
#[derive(Debug, Default)]
pub struct LogSurface {
    markers: HashMap<String, PlotPoint>,
    /// Zone id to displayed count, `None` when no panel is shown
    panel: Option<HashMap<String, i64>>,
    open_popup: Option<String>,
    last_update: Option<String>,
    input_text: String,
    /// Last overlay drawn, to log only changes
    overlay: Option<OverlayView>,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_position(&self, entity_id: &str) -> Option<PlotPoint> {
        self.markers.get(entity_id).copied()
    }

    pub fn zone_count(&self, zone_id: &str) -> Option<i64> {
        self.panel.as_ref()?.get(zone_id).copied()
    }

    pub fn open_popup_id(&self) -> Option<&str> {
        self.open_popup.as_deref()
    }

    pub fn last_update(&self) -> Option<&str> {
        self.last_update.as_deref()
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    fn panel_row(&mut self, zone_id: &str) -> ViewerResult<&mut i64> {
        self.panel
            .as_mut()
            .and_then(|rows| rows.get_mut(zone_id))
            .ok_or_else(|| ViewerError::not_found("zone panel row", zone_id))
    }
}

impl MapSurface for LogSurface {
    fn create_marker(
        &mut self,
        entity_id: &str,
        point: PlotPoint,
        tooltip: &str,
        _card: &PopupCard,
        style: &MarkerStyle,
    ) {
        debug!(
            entity_id,
            row = point.row,
            col = point.col,
            tooltip,
            color = %to_css_rgba(style.color),
            radius = style.radius,
            "[SURFACE] Marker created"
        );
        self.markers.insert(entity_id.to_string(), point);
    }

    fn remove_marker(&mut self, entity_id: &str) {
        debug!(entity_id, "[SURFACE] Marker removed");
        self.markers.remove(entity_id);
        if self.open_popup.as_deref() == Some(entity_id) {
            self.open_popup = None;
        }
    }

    fn slide_marker(&mut self, entity_id: &str, to: PlotPoint, duration: Duration) {
        debug!(
            entity_id,
            row = to.row,
            col = to.col,
            duration_ms = duration.as_millis() as u64,
            "[SURFACE] Marker moved"
        );
        self.markers.insert(entity_id.to_string(), to);
    }

    fn set_tooltip(&mut self, entity_id: &str, tooltip: &str) {
        debug!(entity_id, tooltip, "[SURFACE] Tooltip changed");
    }

    fn set_popup_content(&mut self, entity_id: &str, card: &PopupCard) {
        let [org, zone, seen] = card.detail_lines();
        debug!(entity_id, name = %card.display_name, %org, %zone, %seen, "[SURFACE] Popup content bound");
    }

    fn open_popup(&mut self, entity_id: &str) {
        info!(entity_id, "[SURFACE] Popup opened");
        self.open_popup = Some(entity_id.to_string());
    }

    fn close_popup(&mut self, entity_id: &str) {
        debug!(entity_id, "[SURFACE] Popup closed");
        if self.open_popup.as_deref() == Some(entity_id) {
            self.open_popup = None;
        }
    }

    fn set_image_overlay(&mut self, image_uri: &str, bounds: MapBounds) {
        let (south_west, north_east) = bounds.corners();
        info!(
            image_uri,
            sw = ?(south_west.row, south_west.col),
            ne = ?(north_east.row, north_east.col),
            "[SURFACE] Floor plan shown"
        );
    }

    fn fit_bounds(&mut self, bounds: MapBounds) {
        debug!(width = bounds.width, height = bounds.height, "[SURFACE] View fitted");
    }

    fn show_zone_panel(&mut self, rows: &[ZonePanelRow]) {
        info!(zones = rows.len(), "[SURFACE] Zone panel shown");
        for row in rows {
            debug!(zone_id = %row.zone_id, name = %row.name, count = row.count, "[SURFACE] Zone row");
        }
        self.panel = Some(
            rows.iter()
                .map(|r| (r.zone_id.clone(), r.count))
                .collect(),
        );
    }

    fn remove_zone_panel(&mut self) {
        debug!("[SURFACE] Zone panel removed");
        self.panel = None;
    }

    fn set_zone_count(&mut self, zone_id: &str, count: i64) -> ViewerResult<()> {
        let row = self.panel_row(zone_id)?;
        *row = count;
        info!(zone_id, count, "[SURFACE] Zone count");
        Ok(())
    }

    fn set_zone_highlight(&mut self, zone_id: &str, highlighted: bool) -> ViewerResult<()> {
        self.panel_row(zone_id)?;
        debug!(zone_id, highlighted, "[SURFACE] Zone highlight");
        Ok(())
    }

    fn set_last_update(&mut self, text: &str) -> ViewerResult<()> {
        debug!(text, "[SURFACE] Last update");
        self.last_update = Some(text.to_string());
        Ok(())
    }

    fn render_overlay(&mut self, view: &OverlayView) {
        if self.overlay.as_ref() == Some(view) {
            return;
        }
        match view {
            OverlayView::Results { rows, summary } => {
                info!(rows = rows.len(), %summary, "[SURFACE] Search results");
            }
            OverlayView::NoResults { message } => {
                info!(%message, "[SURFACE] Search results");
            }
            OverlayView::Menu { rows } => {
                info!(maps = rows.len(), "[SURFACE] Map menu");
            }
        }
        self.overlay = Some(view.clone());
    }

    fn hide_overlay(&mut self) {
        if self.overlay.take().is_some() {
            debug!("[SURFACE] Overlay hidden");
        }
    }

    fn focus_input(&mut self) {
        debug!("[SURFACE] Input focused");
    }

    fn set_input_text(&mut self, text: &str) {
        self.input_text = text.to_string();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<ZonePanelRow> {
        vec![
            ZonePanelRow {
                zone_id: "A".to_string(),
                name: "Lobby".to_string(),
                count: 2,
            },
            ZonePanelRow {
                zone_id: "B".to_string(),
                name: "Lab".to_string(),
                count: 0,
            },
        ]
    }

    #[test]
    fn test_marker_lifecycle() {
        let mut surface = LogSurface::new();
        let style = MarkerStyle::default();
        surface.create_marker("e1", PlotPoint::new(1.0, 2.0), "Alice", &PopupCard::default(), &style);
        surface.slide_marker("e1", PlotPoint::new(5.0, 6.0), Duration::from_millis(500));
        assert_eq!(surface.marker_position("e1"), Some(PlotPoint::new(5.0, 6.0)));

        surface.open_popup("e1");
        assert_eq!(surface.open_popup_id(), Some("e1"));

        surface.remove_marker("e1");
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.open_popup_id(), None);
    }

    #[test]
    fn test_zone_rows_require_panel() {
        let mut surface = LogSurface::new();
        assert!(matches!(
            surface.set_zone_count("A", 3),
            Err(ViewerError::NotFound { .. })
        ));

        surface.show_zone_panel(&rows());
        surface.set_zone_count("A", 3).unwrap();
        assert_eq!(surface.zone_count("A"), Some(3));
        assert!(surface.set_zone_highlight("B", true).is_ok());
        assert!(surface.set_zone_highlight("C", true).is_err());

        surface.remove_zone_panel();
        assert_eq!(surface.zone_count("A"), None);
    }

    #[test]
    fn test_overlay_and_input_state() {
        let mut surface = LogSurface::new();
        let view = OverlayView::NoResults {
            message: "No result for \"zed\"".to_string(),
        };
        surface.render_overlay(&view);
        surface.render_overlay(&view);
        assert_eq!(surface.overlay.as_ref(), Some(&view));

        surface.hide_overlay();
        assert!(surface.overlay.is_none());

        surface.set_input_text("ali");
        assert_eq!(surface.input_text(), "ali");
        surface.set_last_update("2024/01/01 09:00:00").unwrap();
        assert_eq!(surface.last_update(), Some("2024/01/01 09:00:00"));
    }
}
