//! Upstream Stratus API access.
//!
//! The CLI and the extension proxy reach the platform's REST API through
//! one shared authenticated client. Base URL and team come from
//! configuration, the token from stored credentials.

pub mod client;

use thiserror::Error;

pub use client::{ApiClient, TeamScope};

/// API client error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL could not be parsed.
    #[error("invalid API base URL \"{url}\": {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A request path could not be joined onto the base URL.
    #[error("invalid API request path \"{path}\": {source}")]
    InvalidRequestPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
}
