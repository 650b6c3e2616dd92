//! Error taxonomy for the viewer
//!
//! Every fetch cycle catches these at its boundary and logs them; none of
//! them is allowed to take the viewer down.

use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by fetchers, the session controller, and render targets
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Request could not be completed (connection failure, non-2xx status)
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
    /// Response body was not the expected record sequence
    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
    /// Referenced map/zone/entity or render target does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Operation invoked before its prerequisites were set up
    #[error("invalid state: {0}")]
    State(String),
}

impl ViewerError {
    pub fn network(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn decode(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_network_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ViewerError::network("GET /entity failed", cause);
        assert_eq!(err.to_string(), "network error: GET /entity failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_not_found_display() {
        let err = ViewerError::not_found("map", "m-42");
        assert_eq!(err.to_string(), "map not found: m-42");
    }

    #[test]
    fn test_state_display() {
        let err = ViewerError::state("no active map");
        assert_eq!(err.to_string(), "invalid state: no active map");
    }
}
