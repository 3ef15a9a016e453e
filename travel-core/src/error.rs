use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the trips backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to send {operation} request to trips backend: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Trips backend {operation} request failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse trips backend {operation} JSON: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid trip id '{0}'")]
    InvalidId(String),

    #[error("Invalid trips backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure resolving a map pin into a place.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Failed to reach the geocoding service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Geocoding request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse geocoding JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("This is not a city, please click somewhere else.")]
    NotACity,
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
