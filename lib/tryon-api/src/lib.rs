//! Client for the RapidAPI `try-on-diffusion` synthesis endpoint.

pub mod client;

#[cfg(any(test, feature = "stub"))]
pub mod stub;

pub use client::{ApiConfig, TryOnApi, TryOnRequest};

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP request {url} failed. Error: {error}")]
    Transport { error: reqwest::Error, url: String },

    #[error("HTTP request {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("API Error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to read upload {path}. Error: {error}")]
    Upload { error: std::io::Error, path: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl ApiError {
    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}
