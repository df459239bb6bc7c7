//! Analysis orchestration: region construction and sequential layer
//! evaluation.
//!
//! One request maps to one pass over the catalog. Layers run sequentially
//! and independently; any failure aborts the whole request (no partial
//! results). A point outside the study area produces an empty region,
//! which degrades to a zero-area response with zero-filled statistics
//! rather than an error.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::client::EeSession;
use crate::error::{EeError, Result};
use crate::expr::Reducer;
use crate::image::Geometry;
use crate::layers::{catalog, LayerDefinition};
use crate::models::{AnalysisRequest, AnalysisResponse, LayerPreview, LayerResult, LayerStatistics};

/// Band name every layer is renamed to before reduction, keeping the
/// reduction keys stable (`value_mean`, `value_min`, ...).
const STATS_BAND: &str = "value";

/// Labels for the three-class discretization, indexed by class.
const CLASS_LABELS: [&str; 3] = ["low", "moderate", "high"];

const SQM_PER_SQKM: f64 = 1_000_000.0;

/// Run the full ten-layer analysis for a validated request.
///
/// `buffer_m` must already be range-checked (see
/// [`AnalysisRequest::resolve_buffer`]); validation happens at the API
/// boundary so no remote call is made for a rejected request.
pub async fn run_analysis(
    session: &EeSession,
    request: &AnalysisRequest,
    buffer_m: u32,
) -> Result<AnalysisResponse> {
    session.ensure_initialized().await?;

    let region = Geometry::point(request.longitude, request.latitude)
        .buffer(buffer_m as f64)
        .intersection(session.study_area());

    let area = session.backend().compute_value(&region.area()).await?;
    // Null means the region vanished in the intersection; anything else
    // non-numeric is a protocol violation, not an empty region.
    let area_m2 = match &area {
        Value::Null => 0.0,
        other => other.as_f64().ok_or_else(|| {
            EeError::MalformedResponse(format!("Geometry.area returned non-numeric {other}"))
        })?,
    };
    let region_area_sqkm = area_m2 / SQM_PER_SQKM;
    tracing::debug!(area_sqkm = region_area_sqkm, "analysis region constructed");

    let mut layers = Vec::with_capacity(catalog().len());
    for definition in catalog() {
        layers.push(evaluate_layer(session, definition, &region).await?);
    }

    Ok(AnalysisResponse {
        requested_at: Utc::now(),
        region_area_sqkm,
        layers,
    })
}

/// Evaluate one catalog entry: clip, reduce, classify, visualize.
async fn evaluate_layer(
    session: &EeSession,
    definition: &LayerDefinition,
    region: &Geometry,
) -> Result<LayerResult> {
    tracing::debug!(layer = %definition.id, "evaluating layer");

    let computed = (definition.compute)(region);
    let clipped = computed.image.clip(region);

    let reduction = session
        .backend()
        .compute_value(&clipped.rename(STATS_BAND).reduce_region(
            Reducer::combined_stats(),
            region,
            definition.scale,
        ))
        .await?;
    let statistics = LayerStatistics::from_reduction(&reduction);

    let classification_summary = match &computed.classification {
        Some(classes) => {
            let histogram = session
                .backend()
                .compute_value(&classes.clip(region).rename(STATS_BAND).reduce_region(
                    Reducer::frequency_histogram(),
                    region,
                    definition.scale,
                ))
                .await?;
            summarize_histogram(&histogram)
        }
        None => None,
    };

    let visualized = clipped.visualize(
        definition.legend_min,
        definition.legend_max,
        definition.palette,
    );
    let tile_url_template = session.backend().create_map(visualized.expr()).await?;
    let thumb_url = session.backend().create_thumbnail(visualized.expr()).await?;

    Ok(LayerResult {
        layer: LayerPreview {
            id: definition.id.to_string(),
            name: definition.name.to_string(),
            description: definition.description.to_string(),
            thumb_url,
            legend_min: definition.legend_min,
            legend_max: definition.legend_max,
            legend_units: definition.units.to_string(),
            palette: definition.palette.iter().map(|c| c.to_string()).collect(),
            tile_url_template,
        },
        statistics,
        classification_summary,
    })
}

/// Convert a frequency histogram into class percentages summing to 100.
///
/// The remote service keys counts by pixel value, formatted either as an
/// integer or a float string. Returns `None` when the reduction saw no
/// pixels (empty region after clipping).
fn summarize_histogram(reduction: &Value) -> Option<BTreeMap<String, f64>> {
    let counts = reduction.get(STATS_BAND)?.as_object()?;

    let mut classes: BTreeMap<String, f64> = BTreeMap::new();
    let mut total = 0.0;
    for (key, count) in counts {
        let count = count.as_f64().unwrap_or(0.0);
        let Ok(class_value) = key.parse::<f64>() else {
            continue;
        };
        let index = (class_value as usize).min(CLASS_LABELS.len() - 1);
        *classes.entry(CLASS_LABELS[index].to_string()).or_insert(0.0) += count;
        total += count;
    }

    if total <= 0.0 {
        return None;
    }
    for percentage in classes.values_mut() {
        *percentage = *percentage / total * 100.0;
    }
    Some(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::client::RasterBackend;
    use crate::config::Settings;
    use crate::expr::Expr;

    /// Backend fake that answers from the shape of the expression graph.
    struct MockBackend {
        auth_calls: AtomicUsize,
        empty_region: bool,
    }

    impl MockBackend {
        fn new(empty_region: bool) -> Arc<Self> {
            Arc::new(Self {
                auth_calls: AtomicUsize::new(0),
                empty_region,
            })
        }
    }

    #[async_trait]
    impl RasterBackend for MockBackend {
        async fn authenticate(&self) -> Result<()> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn compute_value(&self, expression: &Expr) -> Result<Value> {
            let graph = expression.serialize().to_string();

            if graph.contains("Geometry.area") {
                return Ok(json!(if self.empty_region { 0.0 } else { 3.2e8 }));
            }
            if graph.contains("frequencyHistogram") {
                if self.empty_region {
                    return Ok(json!({ "value": {} }));
                }
                return Ok(json!({ "value": { "0": 25.0, "1": 50.0, "2": 25.0 } }));
            }
            if self.empty_region {
                return Ok(json!({
                    "value_mean": null,
                    "value_min": null,
                    "value_max": null,
                    "value_stdDev": null,
                }));
            }
            Ok(json!({
                "value_mean": 42.5,
                "value_min": 1.0,
                "value_max": 97.0,
                "value_stdDev": 12.25,
            }))
        }

        async fn create_map(&self, _visualized: &Expr) -> Result<String> {
            Ok("https://tiles.invalid/{z}/{x}/{y}".to_string())
        }

        async fn create_thumbnail(&self, _visualized: &Expr) -> Result<String> {
            Ok("https://thumbs.invalid/preview.png".to_string())
        }
    }

    fn test_settings() -> Settings {
        Settings {
            service_account: "svc@proj.iam.gserviceaccount.com".to_string(),
            credentials_file: "/etc/keys/ee.json".into(),
            region_asset: "projects/test-project/assets/Algeria".to_string(),
            default_buffer_m: 10_000,
        }
    }

    fn test_request() -> AnalysisRequest {
        AnalysisRequest {
            latitude: 28.03,
            longitude: 1.66,
            buffer_meters: None,
        }
    }

    #[tokio::test]
    async fn test_ten_layers_in_catalog_order() {
        let backend = MockBackend::new(false);
        let session = EeSession::new(backend, test_settings());

        let response = run_analysis(&session, &test_request(), 10_000).await.unwrap();

        assert_eq!(response.layers.len(), 10);
        let ids: Vec<&str> = response.layers.iter().map(|l| l.layer.id.as_str()).collect();
        let expected: Vec<&str> = catalog().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert!((response.region_area_sqkm - 320.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_classification_percentages_sum_to_100() {
        let backend = MockBackend::new(false);
        let session = EeSession::new(backend, test_settings());

        let response = run_analysis(&session, &test_request(), 10_000).await.unwrap();

        let soil = &response.layers[0];
        let summary = soil.classification_summary.as_ref().unwrap();
        let total: f64 = summary.values().sum();
        assert!((total - 100.0).abs() < 0.01);
        assert_eq!(summary["moderate"], 50.0);

        // Raw-measurement layers carry no classification.
        let elevation = &response.layers[5];
        assert_eq!(elevation.layer.id, "elevation");
        assert!(elevation.classification_summary.is_none());
    }

    #[tokio::test]
    async fn test_initialization_happens_once_across_requests() {
        let backend = MockBackend::new(false);
        let session = EeSession::new(backend.clone(), test_settings());

        run_analysis(&session, &test_request(), 10_000).await.unwrap();
        run_analysis(&session, &test_request(), 10_000).await.unwrap();

        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_region_degrades_to_zeros() {
        let backend = MockBackend::new(true);
        let session = EeSession::new(backend, test_settings());

        // A point well outside the study area: intersection is empty.
        let request = AnalysisRequest {
            latitude: -45.0,
            longitude: 170.0,
            buffer_meters: Some(5_000),
        };
        let response = run_analysis(&session, &request, 5_000).await.unwrap();

        assert_eq!(response.region_area_sqkm, 0.0);
        for layer in &response.layers {
            assert_eq!(layer.statistics.mean, 0.0);
            assert_eq!(layer.statistics.std_dev, 0.0);
            assert!(layer.classification_summary.is_none());
        }
    }

    /// Backend whose `Geometry.area` answer is fixed; nothing past the
    /// area computation is reachable when that answer is malformed.
    struct FixedAreaBackend(Value);

    #[async_trait]
    impl RasterBackend for FixedAreaBackend {
        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn compute_value(&self, expression: &Expr) -> Result<Value> {
            let graph = expression.serialize().to_string();
            if graph.contains("Geometry.area") {
                return Ok(self.0.clone());
            }
            Ok(json!({}))
        }

        async fn create_map(&self, _visualized: &Expr) -> Result<String> {
            Ok(String::new())
        }

        async fn create_thumbnail(&self, _visualized: &Expr) -> Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_non_numeric_area_is_a_malformed_response() {
        let backend = Arc::new(FixedAreaBackend(json!("not-a-number")));
        let session = EeSession::new(backend, test_settings());

        let err = run_analysis(&session, &test_request(), 10_000)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::EeError::MalformedResponse(_)));
        assert!(err.to_string().contains("Geometry.area"));
    }

    #[tokio::test]
    async fn test_null_area_reads_as_empty_region() {
        let backend = Arc::new(FixedAreaBackend(json!(null)));
        let session = EeSession::new(backend, test_settings());

        let response = run_analysis(&session, &test_request(), 10_000).await.unwrap();
        assert_eq!(response.region_area_sqkm, 0.0);
    }

    #[test]
    fn test_summarize_histogram_basic() {
        let summary =
            summarize_histogram(&json!({ "value": { "0": 10.0, "1": 30.0, "2": 60.0 } })).unwrap();
        assert_eq!(summary["low"], 10.0);
        assert_eq!(summary["moderate"], 30.0);
        assert_eq!(summary["high"], 60.0);
        let total: f64 = summary.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_histogram_float_keys() {
        let summary =
            summarize_histogram(&json!({ "value": { "0.0": 50.0, "2.0": 50.0 } })).unwrap();
        assert_eq!(summary["low"], 50.0);
        assert_eq!(summary["high"], 50.0);
        assert!(summary.get("moderate").is_none());
    }

    #[test]
    fn test_summarize_histogram_empty_is_none() {
        assert!(summarize_histogram(&json!({ "value": {} })).is_none());
        assert!(summarize_histogram(&json!({})).is_none());
        assert!(summarize_histogram(&json!(null)).is_none());
    }
}
