//! Interaction overlay - search box, result list, and map-switch menu
//!
//! The overlay is a state machine driven by input events and `tick(now)`.
//! It reads the entity cache and the map list but never mutates them; every
//! effect on the rest of the viewer is returned as an `OverlayAction`.
//!
//! Results and menu share the same drop-down, so at most one of them is
//! shown at a time.

use std::time::{Duration, Instant};

use tracing::debug;

use super::constants::{SpecialKey, GENERIC_USER_ICON, USER_ICON_DIR};
use super::format::format_paging_summary;
use super::search::{search, SearchOutcome, SearchResults};
use super::types::{EntityCache, MapInfo};

// =============================================================================
// ACTIONS AND VIEW
// =============================================================================

/// Effects the overlay asks the viewer to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    /// Open the popup of this entity's marker (transient, like a hover)
    OpenMarkerPopup { entity_id: String },
    /// Activate another map
    SwitchMap { map_id: String },
    /// Give keyboard focus back to the search input
    FocusInput,
    /// Replace the search input text
    SetInputText(String),
}

/// What the drop-down is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    Closed,
    Results,
    NoResults,
    Menu,
}

/// One search result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Absolute index into the result list
    pub index: usize,
    pub entity_id: String,
    pub title: String,
    pub detail: String,
    pub icon_uri: String,
    pub fallback_icon_uri: String,
    /// Entity has no marker on the active map
    pub offline: bool,
    pub active: bool,
    pub hovered: bool,
}

/// One map-switch menu row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub index: usize,
    pub map_id: String,
    pub title: String,
    /// Row of the currently active map
    pub active: bool,
    pub hovered: bool,
}

/// Rendered drop-down content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayView {
    Results { rows: Vec<ResultRow>, summary: String },
    NoResults { message: String },
    Menu { rows: Vec<MenuRow> },
}

// =============================================================================
// OVERLAY
// =============================================================================

/// Search and menu state
#[derive(Debug, Clone)]
pub struct Overlay {
    mode: OverlayMode,
    /// Text currently in the search input
    input: String,
    results: Option<SearchResults>,
    /// Query reported by the no-results panel
    failed_query: String,
    /// Drop-down hidden by a blur, shown again on focus
    hidden: bool,
    /// Absolute index of the selected result row
    active: Option<usize>,
    hovered: Option<usize>,
    /// Set by pagination so the blur that follows a page button keeps the
    /// results open
    keep_open: bool,
    refocus_pending: bool,
    search_deadline: Option<Instant>,
    debounce: Duration,
    page_size: usize,
}

impl Overlay {
    pub fn new(debounce: Duration, page_size: usize) -> Self {
        Self {
            mode: OverlayMode::Closed,
            input: String::new(),
            results: None,
            failed_query: String::new(),
            hidden: false,
            active: None,
            hovered: None,
            keep_open: false,
            refocus_pending: false,
            search_deadline: None,
            debounce,
            page_size: page_size.max(1),
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    pub fn active_row(&self) -> Option<usize> {
        self.active
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_pending_search(&self) -> bool {
        self.search_deadline.is_some()
    }

    // -------------------------------------------------------------------------
    // Input field
    // -------------------------------------------------------------------------

    /// Key released in the search input. `text` is the input content after
    /// the key took effect.
    pub fn key_up(&mut self, key_code: u32, text: &str, now: Instant, cache: &EntityCache) {
        self.input = text.to_string();

        match SpecialKey::try_from(key_code) {
            Ok(SpecialKey::Enter) => {
                self.search_deadline = None;
                self.run_search(cache);
            }
            Ok(key) if key.is_arrow() => {}
            _ => {
                self.search_deadline = Some(now + self.debounce);
            }
        }
    }

    pub fn focus(&mut self, cache: &EntityCache) {
        if self.mode == OverlayMode::Menu {
            self.clear();
        }

        match self.mode {
            OverlayMode::Results | OverlayMode::NoResults => {
                if let Some(index) = self.active {
                    let still_open = self
                        .results
                        .as_ref()
                        .and_then(|r| r.id_at(index))
                        .and_then(|id| cache.get(id))
                        .and_then(|e| e.marker.as_ref())
                        .is_some_and(|m| m.is_popup_open());
                    if !still_open {
                        self.active = None;
                    }
                }
                self.hidden = false;
            }
            OverlayMode::Closed | OverlayMode::Menu => self.run_search(cache),
        }
    }

    pub fn blur(&mut self) {
        if self.mode == OverlayMode::Menu {
            self.clear();
        }

        if matches!(self.mode, OverlayMode::Results | OverlayMode::NoResults) {
            if self.keep_open {
                self.keep_open = false;
                self.refocus_pending = true;
            } else {
                self.hidden = true;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Buttons
    // -------------------------------------------------------------------------

    pub fn search_button(&mut self, cache: &EntityCache) {
        self.search_deadline = None;
        self.run_search(cache);
    }

    pub fn clear_button(&mut self) -> Vec<OverlayAction> {
        self.clear();
        vec![OverlayAction::SetInputText(String::new())]
    }

    /// Toggle the map-switch menu. Opening it discards any search.
    pub fn menu_button(&mut self) -> Vec<OverlayAction> {
        let was_open = self.mode == OverlayMode::Menu;
        self.clear();
        if !was_open {
            self.mode = OverlayMode::Menu;
        }
        vec![OverlayAction::SetInputText(String::new())]
    }

    pub fn next_page(&mut self) -> Vec<OverlayAction> {
        let moved = self.results.as_mut().is_some_and(|r| r.next_page());
        self.after_page_move(moved)
    }

    pub fn prev_page(&mut self) -> Vec<OverlayAction> {
        let moved = self.results.as_mut().is_some_and(|r| r.prev_page());
        self.after_page_move(moved)
    }

    fn after_page_move(&mut self, moved: bool) -> Vec<OverlayAction> {
        if !moved {
            return Vec::new();
        }
        self.keep_open = true;
        self.active = None;
        self.hovered = None;
        let query = self
            .results
            .as_ref()
            .map(|r| r.query().to_string())
            .unwrap_or_default();
        self.input = query.clone();
        vec![OverlayAction::SetInputText(query)]
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    /// Pointer entered or left a row
    pub fn hover_row(&mut self, index: usize, entered: bool) {
        if self.active == Some(index) {
            return;
        }
        if entered {
            self.hovered = Some(index);
        } else if self.hovered == Some(index) {
            self.hovered = None;
        }
    }

    /// Result row pressed. Rows whose entity has no marker are inert.
    pub fn press_result(&mut self, index: usize, cache: &EntityCache) -> Vec<OverlayAction> {
        if self.mode != OverlayMode::Results || self.active == Some(index) {
            return Vec::new();
        }
        let Some(entity_id) = self.results.as_ref().and_then(|r| r.id_at(index)) else {
            return Vec::new();
        };
        if !cache.get(entity_id).is_some_and(|e| e.has_marker()) {
            debug!(entity_id, "[OVERLAY] Result has no marker, ignoring");
            return Vec::new();
        }

        let entity_id = entity_id.to_string();
        self.active = Some(index);
        if self.hovered == Some(index) {
            self.hovered = None;
        }
        vec![OverlayAction::OpenMarkerPopup { entity_id }]
    }

    /// Menu row pressed. Choosing the active map does nothing.
    pub fn press_menu(
        &mut self,
        index: usize,
        maps: &[MapInfo],
        active_map: Option<&str>,
    ) -> Vec<OverlayAction> {
        if self.mode != OverlayMode::Menu {
            return Vec::new();
        }
        let Some(map) = maps.get(index) else {
            return Vec::new();
        };
        if map.id.is_empty() || active_map == Some(map.id.as_str()) {
            return Vec::new();
        }

        self.clear();
        vec![
            OverlayAction::SetInputText(String::new()),
            OverlayAction::SwitchMap {
                map_id: map.id.clone(),
            },
        ]
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Fire the debounced search and the deferred refocus when due
    pub fn tick(&mut self, now: Instant, cache: &EntityCache) -> Vec<OverlayAction> {
        let mut actions = Vec::new();

        if self.refocus_pending {
            self.refocus_pending = false;
            actions.push(OverlayAction::FocusInput);
        }

        if self.search_deadline.is_some_and(|at| now >= at) {
            self.search_deadline = None;
            self.run_search(cache);
        }

        actions
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Drop-down content, or `None` when nothing should be shown
    pub fn view(
        &self,
        cache: &EntityCache,
        maps: &[MapInfo],
        active_map: Option<&str>,
    ) -> Option<OverlayView> {
        if self.hidden {
            return None;
        }

        match self.mode {
            OverlayMode::Closed => None,
            OverlayMode::NoResults => Some(OverlayView::NoResults {
                message: format!("No result for \"{}\"", self.failed_query),
            }),
            OverlayMode::Results => {
                let results = self.results.as_ref()?;
                let rows = results
                    .page_entries(cache)
                    .into_iter()
                    .map(|(index, entity)| {
                        let offline = !entity.has_marker();
                        let mut detail = format!("Organization: {}", entity.display_org);
                        if offline {
                            detail.push_str(&format!(" (Last: {})", entity.last_seen_formatted));
                        }
                        let active = self.active == Some(index);
                        ResultRow {
                            index,
                            entity_id: entity.id.clone(),
                            title: entity.display_name.clone(),
                            detail,
                            icon_uri: format!("{}/{}.png", USER_ICON_DIR, entity.id),
                            fallback_icon_uri: GENERIC_USER_ICON.to_string(),
                            offline,
                            active,
                            hovered: !active && self.hovered == Some(index),
                        }
                    })
                    .collect();
                Some(OverlayView::Results {
                    rows,
                    summary: format_paging_summary(results.shown(), results.total()),
                })
            }
            OverlayMode::Menu => {
                let rows = maps
                    .iter()
                    .enumerate()
                    .map(|(index, map)| {
                        let active = active_map == Some(map.id.as_str());
                        MenuRow {
                            index,
                            map_id: map.id.clone(),
                            title: format!("Switch Map: {}", map.name),
                            active,
                            hovered: !active && self.hovered == Some(index),
                        }
                    })
                    .collect();
                Some(OverlayView::Menu { rows })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn run_search(&mut self, cache: &EntityCache) {
        self.active = None;
        self.hovered = None;
        self.hidden = false;

        match search(cache, &self.input, self.page_size) {
            SearchOutcome::Results(results) => {
                debug!(
                    query = %results.query(),
                    total = results.total(),
                    "[OVERLAY] Search results"
                );
                self.results = Some(results);
                self.mode = OverlayMode::Results;
            }
            SearchOutcome::NoResults { query } => {
                debug!(query = %query, "[OVERLAY] No search results");
                self.results = None;
                self.failed_query = query;
                self.mode = OverlayMode::NoResults;
            }
        }
    }

    fn clear(&mut self) {
        self.mode = OverlayMode::Closed;
        self.input.clear();
        self.results = None;
        self.failed_query.clear();
        self.hidden = false;
        self.active = None;
        self.hovered = None;
        self.keep_open = false;
        self.search_deadline = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
