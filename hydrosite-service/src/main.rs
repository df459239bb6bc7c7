//! Hydrosite Service - HTTP microservice for reservoir site suitability.
//!
//! Evaluates ten geospatial suitability/risk layers for a candidate
//! reservoir site against the Earth Engine REST API.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `EE_SERVICE_ACCOUNT` | Earth Engine service account email | Required |
//! | `EE_CREDENTIALS_FILE` | Path to the service-account JSON key | Required |
//! | `ALGERIA_REGION_ASSET` | Study-area table asset id | built-in |
//! | `EE_DEFAULT_BUFFER_M` | Default buffer radius in meters | 10000 |
//! | `HYDROSITE_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /health` - Configured identity and study-area asset
//! - `POST /analysis` - Run the ten-layer analysis for a point + buffer
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use hydrosite::{EeSession, Settings};
use hydrosite_service::{handlers, AppState};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation for the hydrosite service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hydrosite Analysis Service",
        version = "0.1.0",
        description = "Reservoir site suitability analysis backed by Google Earth Engine.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    paths(
        handlers::health_check,
        handlers::perform_analysis,
    ),
    components(
        schemas(
            handlers::HealthResponse,
            handlers::ErrorDetail,
            hydrosite::models::AnalysisRequest,
            hydrosite::models::AnalysisResponse,
            hydrosite::models::LayerResult,
            hydrosite::models::LayerPreview,
            hydrosite::models::LayerStatistics,
        )
    ),
    tags(
        (name = "analysis", description = "Site analysis endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydrosite_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load port from environment (service-specific config)
    let port: u16 = std::env::var("HYDROSITE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // Missing credentials are startup-fatal: refuse to serve traffic.
    let settings = Settings::from_env()?;

    tracing::info!(
        service_account = %settings.service_account,
        region_asset = %settings.region_asset,
        default_buffer_m = settings.default_buffer_m,
        port = port,
        "Starting hydrosite service"
    );

    let session = EeSession::connect(settings)?;
    let state = Arc::new(AppState { session });

    // Build router
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health_check))
        .route("/analysis", post(handlers::perform_analysis))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
