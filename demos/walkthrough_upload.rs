// Batch-upload a recorded walkthrough video for deposit analysis.
//
// Usage: cargo run --example walkthrough_upload -- <video-file> [mime-type]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use leaseguard_voice::{
    BackendClient, CaptureConfig, Config, DeviceSource, SourceProvider, WalkthroughSurface,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => bail!("usage: walkthrough_upload <video-file> [mime-type]"),
    };
    let mime_type = args.next().unwrap_or_else(|| "video/mp4".to_string());

    let cfg = Config::load("config/leaseguard-voice").unwrap_or_default();
    let backend = Arc::new(BackendClient::new(&cfg.backend).context("backend client")?);
    let capture_config = CaptureConfig::default();
    let devices = Arc::new(SourceProvider::new(
        DeviceSource::File { path, mime_type },
        capture_config.clone(),
    ));

    let walkthrough = WalkthroughSurface::new(backend, devices, capture_config);

    walkthrough.start_capture(None).await?;
    walkthrough.stop_capture().await?;

    match walkthrough.report_id().await {
        Some(report_id) => println!("report ready: {report_id}"),
        None => println!("upload finished but no report id was returned"),
    }

    Ok(())
}
