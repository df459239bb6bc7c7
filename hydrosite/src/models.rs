//! Request and response shapes for the analysis API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Smallest accepted buffer radius in meters.
pub const MIN_BUFFER_M: u32 = 1_000;
/// Largest accepted buffer radius in meters.
pub const MAX_BUFFER_M: u32 = 50_000;

/// A site analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Buffer radius in meters (1000-50000). Falls back to the configured
    /// default when omitted.
    pub buffer_meters: Option<u32>,
}

impl AnalysisRequest {
    /// Resolve the effective buffer radius, rejecting out-of-range values
    /// before any remote call is made.
    pub fn resolve_buffer(&self, default_m: u32) -> std::result::Result<u32, String> {
        let buffer = self.buffer_meters.unwrap_or(default_m);
        if !(MIN_BUFFER_M..=MAX_BUFFER_M).contains(&buffer) {
            return Err(format!(
                "buffer_meters must be between {MIN_BUFFER_M} and {MAX_BUFFER_M}, got {buffer}"
            ));
        }
        Ok(buffer)
    }
}

/// Visualization metadata for one layer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LayerPreview {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Public thumbnail URL for quick previews.
    pub thumb_url: String,
    pub legend_min: f64,
    pub legend_max: f64,
    pub legend_units: String,
    pub palette: Vec<String>,
    /// Tile URL template suitable for slippy-map overlay usage.
    pub tile_url_template: String,
}

/// Zonal statistics for one layer over the analysis region.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LayerStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "stdDev")]
    pub std_dev: f64,
}

impl LayerStatistics {
    /// Parse a combined reduction result. Null or missing fields mean the
    /// region had no pixels after clipping; they become zeros rather than
    /// an error.
    pub fn from_reduction(reduction: &Value) -> Self {
        let field = |key: &str| reduction.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        Self {
            mean: field("value_mean"),
            min: field("value_min"),
            max: field("value_max"),
            std_dev: field("value_stdDev"),
        }
    }
}

/// One evaluated layer: preview metadata, statistics, and the optional
/// three-class histogram (percentages summing to 100).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LayerResult {
    pub layer: LayerPreview,
    pub statistics: LayerStatistics,
    pub classification_summary: Option<BTreeMap<String, f64>>,
}

/// The full analysis response: timestamp, region area, and the ten layer
/// results in catalog order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub requested_at: DateTime<Utc>,
    pub region_area_sqkm: f64,
    pub layers: Vec<LayerResult>,
}
