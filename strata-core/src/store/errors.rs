/*
    errors.rs - Error taxonomy for the store layer

    One enum covers both transports so callers stay backend-agnostic.
    Not-found is never an error for reads; everything here is a genuine
    failure surfaced through the returned future.
*/

use crate::store::backend::BackendError;
use crate::store::http::{HttpResponse, TransportError};
use thiserror::Error;

/// Errors surfaced by the local and remote store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A remote operation was attempted while the connection state is not
    /// `connected`. No network call was made.
    #[error("not connected")]
    NotConnected,

    /// The server denied the request; carries the raw response.
    #[error("the server denied our request (status: {})", .0.status)]
    Unauthorized(HttpResponse),

    /// The server answered with a status outside every known class;
    /// carries the raw response.
    #[error("unexpected response (status: {})", .0.status)]
    UnexpectedResponse(HttpResponse),

    /// A response declared as JSON failed to parse; carries the raw
    /// response.
    #[error("received invalid JSON (status: {})", .0.status)]
    InvalidJson(HttpResponse),

    /// The caller supplied a malformed argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// The HTTP transport failed before producing a response; propagated
    /// verbatim.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The local persistence backend failed; propagated verbatim.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::NotConnected.to_string(), "not connected");
        assert_eq!(
            StoreError::Unauthorized(response(401)).to_string(),
            "the server denied our request (status: 401)"
        );
        assert_eq!(
            StoreError::UnexpectedResponse(response(999)).to_string(),
            "unexpected response (status: 999)"
        );
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: StoreError = BackendError::Storage("disk full".to_string()).into();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: StoreError = TransportError("connection refused".to_string()).into();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
