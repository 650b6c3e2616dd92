//! HTTP snapshot fetcher
//!
//! Blocking `reqwest` client for the location service. One call issues one
//! GET; a non-2xx status is a network error and a body that is not the
//! expected JSON array is a decode error.

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::ViewerError;
use crate::core::io_traits::{FetchRequest, SnapshotFetcher};
use crate::core::protocol::{EntityRecord, MapRecord, ZoneRecord};

/// Path segments of a request relative to the service base address.
/// Map ids are single segments and get percent-encoded when joined.
pub fn endpoint_segments(request: &FetchRequest) -> Vec<&str> {
    match request {
        FetchRequest::Maps => vec!["map"],
        FetchRequest::Zones { .. } => vec!["zone"],
        FetchRequest::Entities => vec!["entity"],
        FetchRequest::ZoneCounts { map_id } => vec!["map", map_id.as_str(), "zone"],
    }
}

/// Query parameters of a request
pub fn endpoint_query(request: &FetchRequest) -> Vec<(&'static str, &str)> {
    match request {
        FetchRequest::Zones { map_id } => vec![("map_id", map_id.as_str())],
        _ => Vec::new(),
    }
}

/// Non-2xx statuses are network errors
pub fn check_status(status: StatusCode, url: &Url) -> Result<(), ViewerError> {
    if status.is_success() {
        return Ok(());
    }
    Err(ViewerError::Network {
        message: format!("GET {} returned {}", url, status),
        source: None,
    })
}

/// Decode a JSON array body into records
pub fn decode_records<T: DeserializeOwned>(body: &str, url: &Url) -> Result<Vec<T>, ViewerError> {
    serde_json::from_str(body)
        .map_err(|e| ViewerError::decode(format!("unexpected body from {}", url), e))
}

/// Location service client over blocking HTTP
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: Client,
    base_url: Url,
}

impl HttpSnapshotFetcher {
    pub fn new(base_url: &str) -> Result<Self, ViewerError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ViewerError::network(format!("invalid base address {}", base_url), e))?;
        if parsed.cannot_be_a_base() {
            return Err(ViewerError::Network {
                message: format!("base address {} cannot take a path", base_url),
                source: None,
            });
        }
        let client = Client::builder()
            .build()
            .map_err(|e| ViewerError::network("cannot build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Full URL of a request, path segments and query encoded
    pub fn url_for(&self, request: &FetchRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint_segments(request));
        }
        let query = endpoint_query(request);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn get<T: DeserializeOwned>(&self, request: &FetchRequest) -> Result<Vec<T>, ViewerError> {
        let url = self.url_for(request);
        debug!(url = %url, request = %request, "[FETCH] GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| ViewerError::network(format!("GET {} failed", url), e))?;

        check_status(response.status(), &url)?;

        let body = response
            .text()
            .map_err(|e| ViewerError::network(format!("reading body of {} failed", url), e))?;
        decode_records(&body, &url)
    }
}

impl SnapshotFetcher for HttpSnapshotFetcher {
    fn fetch_maps(&self) -> Result<Vec<MapRecord>, ViewerError> {
        self.get(&FetchRequest::Maps)
    }

    fn fetch_zones_for_map(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError> {
        self.get(&FetchRequest::Zones {
            map_id: map_id.to_string(),
        })
    }

    fn fetch_entities(&self) -> Result<Vec<EntityRecord>, ViewerError> {
        self.get(&FetchRequest::Entities)
    }

    fn fetch_zone_counts(&self, map_id: &str) -> Result<Vec<ZoneRecord>, ViewerError> {
        self.get(&FetchRequest::ZoneCounts {
            map_id: map_id.to_string(),
        })
    }
}
