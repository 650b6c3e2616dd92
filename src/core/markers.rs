//! Marker state - per-marker popup state machine and mutation directives
//!
//! Each visible entity owns a `MarkerState`. Popup visibility is tracked per
//! marker so a click-pinned popup on one marker never affects hover behavior
//! on another.

use super::types::PlotPoint;

// =============================================================================
// POPUP STATE
// =============================================================================

/// Why a marker's popup is currently open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupOpenReason {
    /// Popup is not open
    #[default]
    Closed,
    /// Opened transiently (pointer hover or search result selection)
    Hover,
    /// Opened and pinned by a click until explicitly dismissed
    Click,
}

/// Pointer and popup events reported by the rendering surface for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    HoverStart,
    HoverEnd,
    Click,
    /// The popup was dismissed (close button, map click, another popup opening)
    PopupClosed,
}

/// What the surface should do with the popup after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAction {
    Open,
    Close,
    Nothing,
}

/// Content of the rich popup card bound to a marker
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopupCard {
    pub entity_id: String,
    pub display_name: String,
    pub display_org: String,
    /// Zone the entity is in, "None" when the service reports no zone
    pub zone_name: String,
    pub last_seen: String,
}

impl PopupCard {
    /// Card body lines below the bold name
    pub fn detail_lines(&self) -> [String; 3] {
        [
            format!("Org: {}", self.display_org),
            format!("Zone: {}", self.zone_name),
            format!("Last Seen: {}", self.last_seen),
        ]
    }
}

// =============================================================================
// MARKER STATE
// =============================================================================

/// Live marker owned by a visible entity
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    /// Plotted position (map rows are inverted relative to entity y)
    pub point: PlotPoint,
    /// Permanent label under the marker
    pub tooltip: String,
    /// Card currently bound to the popup. Lags behind the entity's card
    /// while the popup is open.
    pub bound_card: PopupCard,
    pub popup: PopupOpenReason,
}

impl MarkerState {
    pub fn new(point: PlotPoint, tooltip: String, card: PopupCard) -> Self {
        Self {
            point,
            tooltip,
            bound_card: card,
            popup: PopupOpenReason::Closed,
        }
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup != PopupOpenReason::Closed
    }

    pub fn is_pinned(&self) -> bool {
        self.popup == PopupOpenReason::Click
    }

    /// Apply a pointer/popup event and return what the surface must do.
    ///
    /// - hover opens unless the popup is pinned by a click
    /// - hover-out closes unless pinned
    /// - click opens and pins
    /// - dismissal clears the pin
    pub fn handle_event(&mut self, event: MarkerEvent) -> PopupAction {
        match event {
            MarkerEvent::HoverStart => {
                if self.popup == PopupOpenReason::Closed {
                    self.popup = PopupOpenReason::Hover;
                    PopupAction::Open
                } else {
                    PopupAction::Nothing
                }
            }
            MarkerEvent::HoverEnd => {
                if self.popup == PopupOpenReason::Hover {
                    self.popup = PopupOpenReason::Closed;
                    PopupAction::Close
                } else {
                    PopupAction::Nothing
                }
            }
            MarkerEvent::Click => {
                self.popup = PopupOpenReason::Click;
                PopupAction::Open
            }
            MarkerEvent::PopupClosed => {
                self.popup = PopupOpenReason::Closed;
                PopupAction::Nothing
            }
        }
    }
}

// =============================================================================
// DIRECTIVES
// =============================================================================

/// A minimal visual mutation computed by the entity reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerDirective {
    CreateMarker {
        entity_id: String,
        point: PlotPoint,
        tooltip: String,
        card: PopupCard,
    },
    MoveMarker {
        entity_id: String,
        point: PlotPoint,
    },
    UpdateTooltip {
        entity_id: String,
        tooltip: String,
    },
    UpdatePopupContent {
        entity_id: String,
        card: PopupCard,
    },
    RemoveMarker {
        entity_id: String,
    },
}

impl MarkerDirective {
    pub fn entity_id(&self) -> &str {
        match self {
            MarkerDirective::CreateMarker { entity_id, .. }
            | MarkerDirective::MoveMarker { entity_id, .. }
            | MarkerDirective::UpdateTooltip { entity_id, .. }
            | MarkerDirective::UpdatePopupContent { entity_id, .. }
            | MarkerDirective::RemoveMarker { entity_id } => entity_id,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> MarkerState {
        MarkerState::new(
            PlotPoint::new(100.0, 10.0),
            "Alice".to_string(),
            PopupCard::default(),
        )
    }

    #[test]
    fn test_hover_opens_and_closes() {
        let mut m = marker();
        assert_eq!(m.handle_event(MarkerEvent::HoverStart), PopupAction::Open);
        assert!(m.is_popup_open());
        assert_eq!(m.handle_event(MarkerEvent::HoverEnd), PopupAction::Close);
        assert!(!m.is_popup_open());
    }

    #[test]
    fn test_click_pins_against_hover_out() {
        let mut m = marker();
        assert_eq!(m.handle_event(MarkerEvent::Click), PopupAction::Open);
        assert!(m.is_pinned());
        assert_eq!(m.handle_event(MarkerEvent::HoverEnd), PopupAction::Nothing);
        assert_eq!(m.handle_event(MarkerEvent::HoverStart), PopupAction::Nothing);
        assert!(m.is_popup_open());
    }

    #[test]
    fn test_dismiss_clears_pin() {
        let mut m = marker();
        m.handle_event(MarkerEvent::Click);
        assert_eq!(m.handle_event(MarkerEvent::PopupClosed), PopupAction::Nothing);
        assert!(!m.is_pinned());
        // Hover behaves normally again
        assert_eq!(m.handle_event(MarkerEvent::HoverStart), PopupAction::Open);
        assert_eq!(m.handle_event(MarkerEvent::HoverEnd), PopupAction::Close);
    }

    #[test]
    fn test_click_while_hovered_pins() {
        let mut m = marker();
        m.handle_event(MarkerEvent::HoverStart);
        assert_eq!(m.handle_event(MarkerEvent::Click), PopupAction::Open);
        assert_eq!(m.handle_event(MarkerEvent::HoverEnd), PopupAction::Nothing);
        assert!(m.is_popup_open());
    }

    #[test]
    fn test_popup_card_detail_lines() {
        let card = PopupCard {
            entity_id: "e1".to_string(),
            display_name: "Alice".to_string(),
            display_org: "Ops".to_string(),
            zone_name: "Lobby".to_string(),
            last_seen: "2023/11/15 7:13:20".to_string(),
        };
        let lines = card.detail_lines();
        assert_eq!(lines[0], "Org: Ops");
        assert_eq!(lines[1], "Zone: Lobby");
        assert_eq!(lines[2], "Last Seen: 2023/11/15 7:13:20");
    }

    #[test]
    fn test_directive_entity_id() {
        let d = MarkerDirective::RemoveMarker {
            entity_id: "e9".to_string(),
        };
        assert_eq!(d.entity_id(), "e9");
    }
}
