//! # Hydrosite - Reservoir Site Suitability Library
//!
//! Library for assessing candidate reservoir sites against ten geospatial
//! suitability and risk layers (soil stability, rock presence, water
//! availability, flood risk, ...), clipped to a fixed study-area polygon.
//!
//! All raster computation is delegated to the Google Earth Engine REST API.
//! Locally, an analysis is assembled as a lazy expression graph (see
//! [`expr`] and [`image`]) and sent to the `value:compute`, `maps` and
//! `thumbnails` endpoints, which return only scalar aggregates and URLs.
//! No pixel data is ever downloaded or processed by this crate.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hydrosite::{EeSession, Settings};
//! use hydrosite::models::AnalysisRequest;
//!
//! let settings = Settings::from_env()?;
//! let default_buffer = settings.default_buffer_m;
//! let session = EeSession::connect(settings)?;
//!
//! let request = AnalysisRequest {
//!     latitude: 28.03,
//!     longitude: 1.66,
//!     buffer_meters: None,
//! };
//! let buffer_m = request.resolve_buffer(default_buffer).unwrap();
//! let response = hydrosite::run_analysis(&session, &request, buffer_m).await?;
//! println!("{} layers, {:.1} km²", response.layers.len(), response.region_area_sqkm);
//! ```
//!
//! ## Accuracy
//!
//! Region reductions run with `bestEffort` and a 1,000,000-pixel budget:
//! when an exact reduction would exceed the budget, the service coarsens
//! the sampling scale instead of failing. Statistics over large regions
//! are therefore approximate.

pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod expr;
pub mod image;
pub mod layers;
pub mod models;

// Re-export main types at crate root for convenience
pub use analysis::run_analysis;
pub use client::{EeClient, EeSession, RasterBackend};
pub use config::Settings;
pub use error::{EeError, Result};
