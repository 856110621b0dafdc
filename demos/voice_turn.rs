// Run one voice Q&A turn from a pre-recorded audio file.
//
// Usage: cargo run --example voice_turn -- <audio-file> [mime-type]
// Requires the analysis backend from config/leaseguard-voice.toml.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use leaseguard_voice::{
    BackendClient, CaptureConfig, Config, DeviceSource, NullOutput, PlaybackManager, Role,
    SourceProvider, VoiceChatSurface,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => bail!("usage: voice_turn <audio-file> [mime-type]"),
    };
    let mime_type = args.next().unwrap_or_else(|| "audio/wav".to_string());

    let cfg = Config::load("config/leaseguard-voice").unwrap_or_default();
    let backend = Arc::new(BackendClient::new(&cfg.backend).context("backend client")?);
    let playback = Arc::new(PlaybackManager::new(Arc::new(NullOutput)));
    let devices = Arc::new(SourceProvider::new(
        DeviceSource::File { path, mime_type },
        CaptureConfig::default(),
    ));

    let chat = VoiceChatSurface::new(backend, devices, playback, None);

    chat.start_capture().await?;
    chat.stop_capture().await?;

    for turn in chat.transcript().snapshot() {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "leaseguard",
        };
        println!("{who}: {}", turn.content);
    }

    Ok(())
}
