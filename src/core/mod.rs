//! Core module - platform-independent types and viewer logic

pub mod color;
pub mod constants;
pub mod entity_reconciler;
pub mod error;
pub mod format;
pub mod io_traits;
pub mod markers;
pub mod overlay;
pub mod protocol;
pub mod search;
pub mod session;
pub mod traits;
pub mod types;
pub mod zone_reconciler;

pub use color::parse_hex_color;
pub use error::{ViewerError, ViewerResult};
pub use format::format_timestamp;
pub use io_traits::{SnapshotFetcher, SnapshotSource};
pub use protocol::{EntityRecord, MapRecord, ZoneRecord};
pub use session::{MapSession, SessionEvent, SessionPhase};
pub use traits::MapSurface;
