//! Viewer constants - refresh cadences, display limits, input key codes
//!
//! These are the defaults behind every tunable in `client::config`; the
//! session and overlay take their values from configuration, never from here
//! directly.

use num_enum::TryFromPrimitive;
use std::time::Duration;

// =============================================================================
// REFRESH CADENCE
// =============================================================================

/// Period between entity snapshot requests
pub const ENTITY_UPDATE_INTERVAL: Duration = Duration::from_millis(2000);

/// Period between zone count requests
pub const ZONE_UPDATE_INTERVAL: Duration = Duration::from_millis(2000);

/// Delay before retrying a failed map list load
pub const MAP_RETRY_INTERVAL: Duration = Duration::from_millis(2000);

// =============================================================================
// VISUAL TIMING
// =============================================================================

/// How long a zone count stays highlighted after it changes
pub const EMPHASIS_DURATION: Duration = Duration::from_millis(1500);

/// Marker slide animation duration when an entity moves
pub const MARKER_SLIDE_DURATION: Duration = Duration::from_millis(500);

/// Quiet period after the last keystroke before a search runs
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

// =============================================================================
// DISPLAY
// =============================================================================

/// Search results per page
pub const SEARCH_PAGE_SIZE: usize = 10;

/// Zone names longer than this are truncated in the zone panel
pub const ZONE_NAME_MAX_CHARS: usize = 30;

/// Index into the fetched map list used when no map was chosen yet
pub const DEFAULT_MAP_INDEX: usize = 0;

/// Display UTC offset for timestamps (+09:00)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Marker dot diameter in pixels
pub const MARKER_RADIUS: u32 = 15;

/// Marker dot color
pub const MARKER_COLOR: &str = "#0000FF";

/// Marker dot opacity
pub const MARKER_OPACITY: f32 = 0.6;

/// Directory of floor-plan images, one `{map_id}.png` per map
pub const MAP_IMAGE_DIR: &str = "img/map";

/// Directory of entity avatars, one `{entity_id}.png` per entity
pub const USER_ICON_DIR: &str = "img/user";

/// Avatar shown when an entity has no picture of its own
pub const GENERIC_USER_ICON: &str = "img/user/user_generic.svg";

// =============================================================================
// INPUT KEYS
// =============================================================================

/// Key codes the search box reacts to specially
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum SpecialKey {
    Enter = 13,
    Left = 37,
    Up = 38,
    Right = 39,
    Down = 40,
}

impl SpecialKey {
    /// Arrow keys never trigger a search
    pub fn is_arrow(self) -> bool {
        matches!(
            self,
            SpecialKey::Left | SpecialKey::Up | SpecialKey::Right | SpecialKey::Down
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_key_from_code() {
        assert_eq!(SpecialKey::try_from(13u32).ok(), Some(SpecialKey::Enter));
        assert_eq!(SpecialKey::try_from(38u32).ok(), Some(SpecialKey::Up));
        assert!(SpecialKey::try_from(65u32).is_err());
    }

    #[test]
    fn test_arrow_keys() {
        assert!(SpecialKey::Left.is_arrow());
        assert!(SpecialKey::Down.is_arrow());
        assert!(!SpecialKey::Enter.is_arrow());
    }
}
