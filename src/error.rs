// src/error.rs
use thiserror::Error;

/// Failure kinds that abort an update run. Reconciliation drift is
/// deliberately not represented here: it is surfaced as a warning, the run
/// keeps going.
#[derive(Debug, Error)]
pub enum LandscapeError {
    #[error("upstream unavailable ({url}): {source}")]
    UpstreamUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unknown pool identifier: {0}")]
    UnknownIdentifier(String),
}
