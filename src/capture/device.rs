use std::path::PathBuf;

use tokio::sync::mpsc;

use super::payload::MediaKind;
use crate::error::CaptureError;

/// One fragment of recorded media as it leaves the device.
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Container bytes (not raw samples); empty fragments are dropped by the session.
    pub data: Vec<u8>,
    /// Milliseconds since the device went live.
    pub timestamp_ms: u64,
}

/// Which tracks the caller wants on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConstraints {
    pub audio: bool,
    pub video: bool,
}

impl DeviceConstraints {
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }

    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A live stream handle: the negotiated container format plus the channel
/// the device feeds chunks into. The channel closes when the device is
/// released (after flushing any buffered data).
pub struct LiveStream {
    pub mime_type: String,
    pub kind: MediaKind,
    pub rx: mpsc::Receiver<MediaChunk>,
}

/// Configuration for capture devices
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will decimate if the hardware runs faster)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz, what the STT backend expects
            channels: 1,        // Mono
        }
    }
}

/// Media capture device trait
///
/// Platform-specific implementations:
/// - Native: cpal microphone capture
/// - File: stream a pre-recorded file (for testing/batch upload)
/// - Browser / mobile AV capture live outside this crate behind the same seam
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request the hardware and start producing chunks.
    ///
    /// Suspends for as long as the platform's permission prompt is open;
    /// there is no timeout here, the caller stays responsive and may drop
    /// the future to abandon the attempt.
    async fn acquire(&mut self, constraints: DeviceConstraints) -> Result<LiveStream, CaptureError>;

    /// Stop the hardware, flush buffered data into the stream, close it.
    ///
    /// Idempotent: calling release on an already-released device is a no-op.
    async fn release(&mut self) -> Result<(), CaptureError>;

    /// Whether the device currently holds live hardware.
    fn is_live(&self) -> bool;

    /// Device name for logging.
    fn name(&self) -> &str;
}

/// Capture source type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSource {
    /// Default system microphone (all platforms with an input device).
    Microphone,
    /// Camera + microphone. No native backend in this crate.
    Camera,
    /// Pre-recorded file (testing / batch upload of an existing recording).
    File { path: PathBuf, mime_type: String },
}

/// Capture device factory.
pub struct CaptureDeviceFactory;

impl CaptureDeviceFactory {
    /// Create a capture device for the given source.
    pub fn create(
        source: &DeviceSource,
        config: &CaptureConfig,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        match source {
            DeviceSource::Microphone => Ok(Box::new(super::microphone::MicrophoneDevice::new(
                config.clone(),
            ))),

            DeviceSource::Camera => Err(CaptureError::Unsupported(
                "camera capture requires a platform media backend".to_string(),
            )),

            DeviceSource::File { path, mime_type } => Ok(Box::new(
                super::file::FileDevice::new(path.clone(), mime_type.clone()),
            )),
        }
    }
}

/// Injection seam between a turn controller and the device layer: the
/// controller opens a fresh device per recording attempt.
pub trait DeviceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

/// Standard provider backed by the factory.
pub struct SourceProvider {
    source: DeviceSource,
    config: CaptureConfig,
}

impl SourceProvider {
    pub fn new(source: DeviceSource, config: CaptureConfig) -> Self {
        Self { source, config }
    }
}

impl DeviceProvider for SourceProvider {
    fn open(&self) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        CaptureDeviceFactory::create(&self.source, &self.config)
    }
}
