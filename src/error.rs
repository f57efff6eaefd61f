//! Error types
//!
//! Every failure of the engine is returned to the immediate caller as an
//! [`Error`]. Only the fetch pipeline aggregates, keeping the first failure.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building queries, talking to the server or
/// materializing responses.
#[derive(Debug, Error)]
pub enum Error {
    /// No descriptor is registered for the requested type.
    #[error("no descriptor registered for type \"{0}\"")]
    NotFound(String),

    /// The type has no list tag and can only appear embedded in another object.
    #[error("type \"{0}\" has no list tag and cannot be requested on its own")]
    NotListable(String),

    /// A filter key does not name a projectable field.
    #[error("invalid filter: {0}")]
    Filter(String),

    /// The response document is malformed or a value could not be coerced.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A field refers to a type that is neither a scalar nor registered.
    #[error("unsupported type \"{ty}\" for field \"{field}\"")]
    Type { field: String, ty: String },

    /// A timestamp did not match the wire format.
    #[error("invalid timestamp \"{value}\" in field \"{field}\": {reason}")]
    TimeParse {
        field: String,
        value: String,
        reason: String,
    },

    /// Opaque failure of the transport collaborator.
    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// The server answered with an unexpected status code.
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },

    /// The server returned no content for an item, usually because it was deleted.
    #[error("empty response for \"{0}\" (item may have been deleted)")]
    EmptyResponse(String),

    /// A query expected to match exactly one item matched a different number.
    #[error("expected exactly one match, found {0}")]
    NotUnique(usize),

    /// A lookup by title (QM project, global configuration) found nothing.
    #[error("{0} not found")]
    Missing(String),

    /// The descriptor catalog is inconsistent.
    #[error("invalid catalog: {0}")]
    Schema(String),

    /// A materialized object could not be decoded into a typed struct.
    #[error("failed to decode object: {0}")]
    Decode(#[from] serde_json::Error),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// First failure recorded by the fetch pipeline.
    #[error("fetch aborted: {0}")]
    AggregateFetch(#[source] Box<Error>),
}

impl Error {
    /// The underlying failure of an aggregated fetch error, or `self`.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::AggregateFetch(inner) => inner.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_aggregate() {
        let err = Error::AggregateFetch(Box::new(Error::EmptyResponse("42".to_string())));
        assert!(matches!(err.root_cause(), Error::EmptyResponse(id) if id == "42"));
        assert!(err.to_string().contains("fetch aborted"));
    }

    #[test]
    fn test_status_message() {
        let err = Error::Status {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "server responded with 403: forbidden");
    }
}
