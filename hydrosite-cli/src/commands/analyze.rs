use anyhow::{anyhow, Context, Result};
use hydrosite::models::AnalysisRequest;
use hydrosite::{EeSession, Settings};

pub async fn run(lat: f64, lon: f64, buffer: Option<u32>, pretty: bool) -> Result<()> {
    let settings = Settings::from_env().context(
        "missing Earth Engine credentials. Set EE_SERVICE_ACCOUNT and EE_CREDENTIALS_FILE",
    )?;

    let request = AnalysisRequest {
        latitude: lat,
        longitude: lon,
        buffer_meters: buffer,
    };
    let buffer_m = request
        .resolve_buffer(settings.default_buffer_m)
        .map_err(|message| anyhow!(message))?;

    let session = EeSession::connect(settings).context("failed to create Earth Engine session")?;

    let response = hydrosite::run_analysis(&session, &request, buffer_m)
        .await
        .context("analysis failed")?;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}
