// src/error.rs
//! Error taxonomy for the harvesting side of the pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The remote answered with a non-2xx status
    #[error("request to {url} failed with HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// The request never produced a response (connect, TLS, timeout)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not the structured format we expected
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Structured scope document without the scope item list
    #[error("scope document has no item list at `{pointer}`")]
    MalformedDocument { pointer: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// HTTP status of a failed fetch, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            HarvestError::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
