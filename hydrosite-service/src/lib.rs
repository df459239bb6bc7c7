//! Hydrosite Service Library
//!
//! HTTP handlers and types for the reservoir site suitability service.
//! This library is used by both the hydrosite-service binary and
//! integration tests.

pub mod handlers;

use hydrosite::EeSession;

/// Application state shared across handlers.
pub struct AppState {
    /// Process-wide Earth Engine session (authenticated once, study-area
    /// geometry memoized).
    pub session: EeSession,
}

// Re-export commonly used types for convenience
pub use handlers::{ErrorDetail, HealthResponse};
