//! Error types for the hydrosite library.

use thiserror::Error;

/// Errors that can occur while configuring a session or running an analysis.
///
/// Two tiers: `Config` and `Auth` are fatal at startup and prevent the
/// process from serving traffic; everything else is a per-request failure
/// surfaced to the caller as-is.
#[derive(Error, Debug)]
pub enum EeError {
    /// A required environment variable is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication against Earth Engine failed.
    #[error("Earth Engine authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure talking to the remote service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service rejected a request.
    #[error("Earth Engine API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The remote service answered with a shape we cannot interpret.
    #[error("malformed Earth Engine response: {0}")]
    MalformedResponse(String),
}

/// Result type alias using [`EeError`].
pub type Result<T> = std::result::Result<T, EeError>;
