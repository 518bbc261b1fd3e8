use std::time::Duration;
use thiserror::Error;

/// Why a single source could not be fetched. Absorbed by the acquisition
/// layer, which substitutes fallback content instead.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("could not extract text from {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Failure of the external generative model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model returned an empty answer")]
    EmptyResponse,
    #[error("model call exceeded {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The model failed and there was no content to fall back on.
    #[error("no relevant content and the model is unavailable: {source}")]
    ModelUnavailable {
        #[source]
        source: ModelError,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
