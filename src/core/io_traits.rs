//! I/O traits for snapshot fetching
//!
//! `SnapshotFetcher` is the synchronous one-request-per-call contract that the
//! HTTP client implements. `SnapshotSource` is the non-blocking boundary the
//! session talks to: requests go out tagged with a generation, responses are
//! polled back later. Both are mockable for tests on any platform.

use std::fmt;

use super::error::ViewerError;
use super::protocol::{EntityRecord, MapRecord, ZoneRecord};

// =============================================================================
// REQUESTS
// =============================================================================

/// One snapshot request against the location service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// `GET /map`
    Maps,
    /// `GET /zone?map_id=X` (zone list, loaded once per map activation)
    Zones { map_id: String },
    /// `GET /entity`
    Entities,
    /// `GET /map/{X}/zone` (periodic occupancy counts)
    ZoneCounts { map_id: String },
}

impl FetchRequest {
    /// Map the request is scoped to, if any
    pub fn map_id(&self) -> Option<&str> {
        match self {
            FetchRequest::Zones { map_id } | FetchRequest::ZoneCounts { map_id } => Some(map_id),
            FetchRequest::Maps | FetchRequest::Entities => None,
        }
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchRequest::Maps => write!(f, "maps"),
            FetchRequest::Zones { map_id } => write!(f, "zones({})", map_id),
            FetchRequest::Entities => write!(f, "entities"),
            FetchRequest::ZoneCounts { map_id } => write!(f, "zone-counts({})", map_id),
        }
    }
}

/// Identifies a request so its response can be checked for staleness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTag {
    /// Session generation at the time of the request
    pub generation: u64,
    pub request: FetchRequest,
}

impl FetchTag {
    pub fn new(generation: u64, request: FetchRequest) -> Self {
        Self {
            generation,
            request,
        }
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Decoded body of a completed request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Maps(Vec<MapRecord>),
    Zones(Vec<ZoneRecord>),
    Entities(Vec<EntityRecord>),
}

/// A completed request, successful or not
#[derive(Debug)]
pub struct FetchResponse {
    pub tag: FetchTag,
    pub result: Result<FetchPayload, ViewerError>,
}

impl FetchResponse {
    pub fn new(tag: FetchTag, result: Result<FetchPayload, ViewerError>) -> Self {
        Self { tag, result }
    }
}

// =============================================================================
// I/O TRAITS
// =============================================================================

/// Blocking access to the location service. Each call issues one request.
pub trait SnapshotFetcher {
    /// All known maps
    fn fetch_maps(&self) -> Result<Vec<MapRecord>, ViewerError>;

    /// Zone list for a map, used to build the zone panel
    fn fetch_zones_for_map(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError>;

    /// Every entity in the system, regardless of map
    fn fetch_entities(&self) -> Result<Vec<EntityRecord>, ViewerError>;

    /// Current occupancy counts for a map's zones
    fn fetch_zone_counts(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError>;

    /// Run a request and wrap its records in a payload
    fn fetch(&self, request: &FetchRequest) -> Result<FetchPayload, ViewerError> {
        match request {
            FetchRequest::Maps => self.fetch_maps().map(FetchPayload::Maps),
            FetchRequest::Zones { map_id } => {
                self.fetch_zones_for_map(map_id).map(FetchPayload::Zones)
            }
            FetchRequest::Entities => self.fetch_entities().map(FetchPayload::Entities),
            FetchRequest::ZoneCounts { map_id } => {
                self.fetch_zone_counts(map_id).map(FetchPayload::Zones)
            }
        }
    }
}

/// Non-blocking request/response channel used by the session
pub trait SnapshotSource {
    /// Start a request. Never blocks.
    fn request(&mut self, tag: FetchTag);

    /// Poll for the next completed response (non-blocking)
    fn poll_response(&mut self) -> Option<FetchResponse>;
}

// =============================================================================
// MOCK IMPLEMENTATIONS FOR TESTING
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Mock snapshot source for testing
    ///
    /// This mock allows tests to:
    /// - Track which requests were issued and with which generation
    /// - Complete requests by queueing responses for `poll_response()`
    #[derive(Default)]
    pub struct MockSnapshotSource {
        /// Requests that were issued, in order
        pub requests: RefCell<Vec<FetchTag>>,
        /// Responses to return from poll_response()
        pub pending: RefCell<VecDeque<FetchResponse>>,
    }

    impl MockSnapshotSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response to be returned by poll_response()
        pub fn queue(&self, tag: FetchTag, result: Result<FetchPayload, ViewerError>) {
            self.pending
                .borrow_mut()
                .push_back(FetchResponse::new(tag, result));
        }

        /// Complete the most recent request of this kind with `payload`
        pub fn complete(&self, request: &FetchRequest, payload: FetchPayload) {
            let tag = self
                .last_request_tag(request)
                .unwrap_or_else(|| panic!("no {} request was issued", request));
            self.queue(tag, Ok(payload));
        }

        /// Fail the most recent request of this kind
        pub fn fail(&self, request: &FetchRequest, error: ViewerError) {
            let tag = self
                .last_request_tag(request)
                .unwrap_or_else(|| panic!("no {} request was issued", request));
            self.queue(tag, Err(error));
        }

        pub fn last_request_tag(&self, request: &FetchRequest) -> Option<FetchTag> {
            self.requests
                .borrow()
                .iter()
                .rev()
                .find(|t| &t.request == request)
                .cloned()
        }

        /// Number of issued requests matching `request`
        pub fn count(&self, request: &FetchRequest) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|t| &t.request == request)
                .count()
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl SnapshotSource for MockSnapshotSource {
        fn request(&mut self, tag: FetchTag) {
            self.requests.borrow_mut().push(tag);
        }

        fn poll_response(&mut self) -> Option<FetchResponse> {
            self.pending.borrow_mut().pop_front()
        }
    }

    /// Mock fetcher returning canned records
    #[derive(Default)]
    pub struct MockFetcher {
        pub maps: Vec<MapRecord>,
        pub zones: Vec<ZoneRecord>,
        pub entities: Vec<EntityRecord>,
        /// Requests served, in order
        pub calls: RefCell<Vec<FetchRequest>>,
        /// When set, every call fails with a network error
        pub offline: bool,
    }

    impl MockFetcher {
        fn serve<T: Clone>(&self, request: FetchRequest, data: &[T]) -> Result<Vec<T>, ViewerError> {
            self.calls.borrow_mut().push(request.clone());
            if self.offline {
                return Err(ViewerError::network(
                    format!("{} unavailable", request),
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline"),
                ));
            }
            Ok(data.to_vec())
        }
    }

    impl SnapshotFetcher for MockFetcher {
        fn fetch_maps(&self) -> Result<Vec<MapRecord>, ViewerError> {
            self.serve(FetchRequest::Maps, &self.maps)
        }

        fn fetch_zones_for_map(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError> {
            self.serve(
                FetchRequest::Zones {
                    map_id: map_id.to_string(),
                },
                &self.zones,
            )
        }

        fn fetch_entities(&self) -> Result<Vec<EntityRecord>, ViewerError> {
            self.serve(FetchRequest::Entities, &self.entities)
        }

        fn fetch_zone_counts(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError> {
            self.serve(
                FetchRequest::ZoneCounts {
                    map_id: map_id.to_string(),
                },
                &self.zones,
            )
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
