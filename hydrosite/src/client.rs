//! Remote session lifecycle and the Earth Engine REST backend.
//!
//! [`RasterBackend`] is the seam between the analysis code and the remote
//! service: the production [`EeClient`] posts expression graphs to the
//! Earth Engine v1 endpoints, and tests substitute an in-memory fake.
//!
//! [`EeSession`] owns the process-wide singletons: the authenticated
//! backend (initialized exactly once) and the memoized study-area
//! geometry. Neither is ever invalidated; a change to the backing asset
//! requires a process restart to take effect (known limitation).

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::config::Settings;
use crate::error::{EeError, Result};
use crate::expr::Expr;
use crate::image::Geometry;

const API_BASE: &str = "https://earthengine.googleapis.com";
const EE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Thumbnail edge length in pixels.
const THUMB_DIMENSION: u32 = 512;

/// The remote raster-analysis service, reduced to the four operations the
/// orchestrator needs.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    /// Authenticate against the remote service. Reached exactly once per
    /// process through [`EeSession::ensure_initialized`].
    async fn authenticate(&self) -> Result<()>;

    /// Evaluate an expression, returning its scalar or dictionary result.
    async fn compute_value(&self, expression: &Expr) -> Result<Value>;

    /// Register a visualized image and return a tile URL template.
    async fn create_map(&self, visualized: &Expr) -> Result<String>;

    /// Register a visualized image and return a static thumbnail URL.
    async fn create_thumbnail(&self, visualized: &Expr) -> Result<String>;
}

/// Production backend over the Earth Engine v1 REST API.
///
/// Credentials are minted from the configured service-account JSON key;
/// token refresh is handled by the provider, so each request simply asks
/// for a current bearer token.
pub struct EeClient {
    http: reqwest::Client,
    settings: Settings,
    account: OnceCell<CustomServiceAccount>,
}

impl EeClient {
    pub fn new(settings: Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            settings,
            account: OnceCell::new(),
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let account = self
            .account
            .get_or_try_init(|| async {
                CustomServiceAccount::from_file(&self.settings.credentials_file)
                    .map_err(|e| EeError::Auth(e.to_string()))
            })
            .await?;
        let token = account
            .token(&[EE_SCOPE])
            .await
            .map_err(|e| EeError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{API_BASE}/v1/projects/{}/{endpoint}",
            self.settings.project()
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EeError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RasterBackend for EeClient {
    async fn authenticate(&self) -> Result<()> {
        tracing::info!(
            service_account = %self.settings.service_account,
            "initialising Earth Engine session"
        );
        self.bearer_token().await.map(|_| ())
    }

    async fn compute_value(&self, expression: &Expr) -> Result<Value> {
        let body = json!({ "expression": expression.serialize() });
        let response = self.post("value:compute", body).await?;
        response.get("result").cloned().ok_or_else(|| {
            EeError::MalformedResponse("value:compute response missing `result`".to_string())
        })
    }

    async fn create_map(&self, visualized: &Expr) -> Result<String> {
        let body = json!({ "expression": visualized.serialize() });
        let response = self.post("maps", body).await?;
        let name = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EeError::MalformedResponse("maps response missing `name`".to_string())
            })?;
        Ok(format!("{API_BASE}/v1/{name}/tiles/{{z}}/{{x}}/{{y}}"))
    }

    async fn create_thumbnail(&self, visualized: &Expr) -> Result<String> {
        let body = json!({
            "expression": visualized.serialize(),
            "fileFormat": "PNG",
            "grid": {
                "dimensions": { "width": THUMB_DIMENSION, "height": THUMB_DIMENSION },
            },
        });
        let response = self.post("thumbnails", body).await?;
        let name = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EeError::MalformedResponse("thumbnails response missing `name`".to_string())
            })?;
        Ok(format!("{API_BASE}/v1/{name}:getPixels"))
    }
}

/// Process-wide Earth Engine session.
///
/// Holds the backend handle, the settings it was created from, and the two
/// write-once singletons: the initialization flag and the study-area
/// geometry. Both are populated on first use and live for the rest of the
/// process; no lock discipline is needed beyond the cells themselves.
pub struct EeSession {
    backend: Arc<dyn RasterBackend>,
    settings: Settings,
    init: OnceCell<()>,
    study_area: OnceLock<Geometry>,
}

impl EeSession {
    /// Wrap an existing backend (tests inject fakes here).
    pub fn new(backend: Arc<dyn RasterBackend>, settings: Settings) -> Self {
        Self {
            backend,
            settings,
            init: OnceCell::new(),
            study_area: OnceLock::new(),
        }
    }

    /// Create a session backed by the live REST API.
    pub fn connect(settings: Settings) -> Result<Self> {
        let client = EeClient::new(settings.clone())?;
        Ok(Self::new(Arc::new(client), settings))
    }

    /// Authenticate the backend, exactly once per process.
    ///
    /// Safe to call from every entry point; repeated calls after a
    /// successful initialization are no-ops. A failed attempt is retried
    /// on the next call, and the error propagates to the caller.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.init
            .get_or_try_init(|| self.backend.authenticate())
            .await
            .map(|_| ())
    }

    /// The study-area geometry, built lazily and memoized for the life of
    /// the process.
    pub fn study_area(&self) -> &Geometry {
        self.study_area
            .get_or_init(|| Geometry::table_footprint(&self.settings.region_asset))
    }

    pub fn backend(&self) -> &dyn RasterBackend {
        self.backend.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        auth_calls: AtomicUsize,
        fail_auth: bool,
    }

    #[async_trait]
    impl RasterBackend for CountingBackend {
        async fn authenticate(&self) -> Result<()> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_auth {
                Err(EeError::Auth("bad credentials".to_string()))
            } else {
                Ok(())
            }
        }

        async fn compute_value(&self, _expression: &Expr) -> Result<Value> {
            Ok(Value::Null)
        }

        async fn create_map(&self, _visualized: &Expr) -> Result<String> {
            Ok(String::new())
        }

        async fn create_thumbnail(&self, _visualized: &Expr) -> Result<String> {
            Ok(String::new())
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

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() {
        let backend = Arc::new(CountingBackend {
            auth_calls: AtomicUsize::new(0),
            fail_auth: false,
        });
        let session = EeSession::new(backend.clone(), test_settings());

        session.ensure_initialized().await.unwrap();
        session.ensure_initialized().await.unwrap();
        session.ensure_initialized().await.unwrap();

        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_propagates_and_retries() {
        let backend = Arc::new(CountingBackend {
            auth_calls: AtomicUsize::new(0),
            fail_auth: true,
        });
        let session = EeSession::new(backend.clone(), test_settings());

        assert!(session.ensure_initialized().await.is_err());
        assert!(session.ensure_initialized().await.is_err());

        // A failed attempt does not latch the once-cell.
        assert_eq!(backend.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_study_area_is_memoized() {
        let backend = Arc::new(CountingBackend {
            auth_calls: AtomicUsize::new(0),
            fail_auth: false,
        });
        let session = EeSession::new(backend, test_settings());

        let first = session.study_area().expr().serialize();
        let second = session.study_area().expr().serialize();
        assert_eq!(first, second);
        assert!(first.to_string().contains("projects/test-project/assets/Algeria"));
    }
}
