use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use leaseguard_voice::{
    AppState, AudioOutput, BackendClient, CaptureConfig, Config, DeviceSource, MaintenanceSurface,
    NullOutput, PlaybackManager, RodioOutput, SourceProvider, VoiceChatSurface, WalkthroughSurface,
};

#[derive(Debug, Parser)]
#[command(name = "leaseguard-voice", about = "Capture and turn-taking engine")]
struct Cli {
    /// Config file stem (TOML)
    #[arg(long, default_value = "config/leaseguard-voice")]
    config: String,

    /// Skip audio output even when a device exists
    #[arg(long)]
    silent: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "HTTP control API will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );
    info!("Analysis backend: {}", cfg.backend.base_url);

    let backend = Arc::new(BackendClient::new(&cfg.backend).context("backend client")?);

    let output: Arc<dyn AudioOutput> = if cli.silent {
        info!("audio output disabled (--silent)");
        Arc::new(NullOutput)
    } else {
        match RodioOutput::new() {
            Ok(output) => Arc::new(output),
            Err(e) => {
                warn!("no audio output, replies will be text-only: {e}");
                Arc::new(NullOutput)
            }
        }
    };
    let playback = Arc::new(PlaybackManager::new(output));

    let capture_config = CaptureConfig {
        sample_rate: cfg.capture.sample_rate,
        channels: cfg.capture.channels,
    };
    let microphone = Arc::new(SourceProvider::new(
        DeviceSource::Microphone,
        capture_config.clone(),
    ));
    let camera = Arc::new(SourceProvider::new(
        DeviceSource::Camera,
        capture_config.clone(),
    ));

    let chat = Arc::new(VoiceChatSurface::new(
        backend.clone(),
        microphone.clone(),
        playback.clone(),
        Some(cfg.chat.greeting.clone()),
    ));
    let maintenance = Arc::new(MaintenanceSurface::new(
        backend.clone(),
        microphone,
        playback,
    ));
    let walkthrough = Arc::new(WalkthroughSurface::new(backend, camera, capture_config));

    let state = AppState::new(chat, maintenance, walkthrough);
    let app = leaseguard_voice::create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("listening on {addr}");
    axum::serve(listener, app).await.context("http server")?;

    Ok(())
}
