//! Service configuration loaded from environment variables.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `EE_SERVICE_ACCOUNT` | Earth Engine service account email | Required |
//! | `EE_CREDENTIALS_FILE` | Path to the service-account JSON key | Required |
//! | `ALGERIA_REGION_ASSET` | Study-area table asset id | built-in |
//! | `EE_DEFAULT_BUFFER_M` | Default buffer radius in meters | 10000 |
//!
//! Configuration problems are startup-time fatal: the process refuses to
//! start rather than serving traffic it cannot back.

use std::path::PathBuf;

use crate::error::{EeError, Result};

/// Built-in study-area asset, overridable via `ALGERIA_REGION_ASSET`.
pub const DEFAULT_REGION_ASSET: &str = "projects/ee-bensefiasofian/assets/Maine";

/// Default buffer radius in meters when a request omits `buffer_meters`.
pub const DEFAULT_BUFFER_M: u32 = 10_000;

/// Application settings, immutable after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Earth Engine service account email (reported by `/health`).
    pub service_account: String,
    /// Path to the service-account JSON key file.
    pub credentials_file: PathBuf,
    /// Table asset whose footprint is the study-area polygon.
    pub region_asset: String,
    /// Default buffer radius in meters.
    pub default_buffer_m: u32,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`EeError::Config`] if a required variable is missing or
    /// a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an injected variable lookup.
    ///
    /// The lookup indirection keeps tests hermetic: they pass a closure
    /// over a map instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let service_account = lookup("EE_SERVICE_ACCOUNT")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                EeError::Config(
                    "EE_SERVICE_ACCOUNT must contain the Earth Engine service account email"
                        .to_string(),
                )
            })?;

        let credentials_file = lookup("EE_CREDENTIALS_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                EeError::Config(
                    "EE_CREDENTIALS_FILE must point at the service-account JSON key".to_string(),
                )
            })?;

        let region_asset =
            lookup("ALGERIA_REGION_ASSET").unwrap_or_else(|| DEFAULT_REGION_ASSET.to_string());

        let default_buffer_m = match lookup("EE_DEFAULT_BUFFER_M") {
            Some(value) => value.parse().map_err(|_| {
                EeError::Config(format!(
                    "EE_DEFAULT_BUFFER_M must be an integer number of meters, got {value:?}"
                ))
            })?,
            None => DEFAULT_BUFFER_M,
        };

        Ok(Self {
            service_account,
            credentials_file,
            region_asset,
            default_buffer_m,
        })
    }

    /// Cloud project id used to address the REST endpoints, parsed from
    /// the region asset path (`projects/<id>/assets/...`).
    ///
    /// Assets that predate the cloud-project naming scheme fall back to
    /// the shared legacy project.
    pub fn project(&self) -> &str {
        let mut parts = self.region_asset.split('/');
        match (parts.next(), parts.next()) {
            (Some("projects"), Some(id)) if !id.is_empty() => id,
            _ => "earthengine-legacy",
        }
    }
}
