// Native microphone capture via cpal.
//
// PCM accumulates while the stream is live; release() downmixes/decimates to
// the configured format, wraps it in a WAV container, and flushes it as the
// final chunk before closing the stream channel.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::device::{CaptureConfig, CaptureDevice, DeviceConstraints, LiveStream, MediaChunk};
use super::payload::MediaKind;
use crate::error::CaptureError;

/// Wrapper to make `cpal::Stream` Send.
///
/// `cpal::Stream` is `!Send` on some platforms due to internal raw pointers,
/// but we only hold it alive: we never move it across threads after
/// creation. The stream's audio callback runs on its own internal thread
/// managed by cpal.
struct SendStream(cpal::Stream);

// SAFETY: We only store the stream to keep it alive. The stream itself
// manages its own internal threading. We never access it from another
// thread; we only drop it, which is safe.
unsafe impl Send for SendStream {}
unsafe impl Sync for SendStream {}

/// Microphone capture device (default system input).
pub struct MicrophoneDevice {
    config: CaptureConfig,
    stream: Option<SendStream>,
    samples: Arc<Mutex<Vec<i16>>>,
    native_rate: u32,
    native_channels: u16,
    chunk_tx: Option<mpsc::Sender<MediaChunk>>,
    started: Option<Instant>,
    live: bool,
}

impl MicrophoneDevice {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stream: None,
            samples: Arc::new(Mutex::new(Vec::new())),
            native_rate: 0,
            native_channels: 0,
            chunk_tx: None,
            started: None,
            live: false,
        }
    }

    /// Encode everything captured so far into one WAV container.
    fn finalize_wav(&self) -> Result<Vec<u8>, CaptureError> {
        let captured = {
            let guard = match self.samples.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };

        let mono = downmix(&captured, self.native_channels, self.config.channels);
        let resampled = decimate(&mono, self.native_rate, self.config.sample_rate);

        let out_channels = if self.native_channels == 2 && self.config.channels == 1 {
            1
        } else {
            self.native_channels.max(1)
        };

        let spec = hound::WavSpec {
            channels: out_channels,
            sample_rate: effective_rate(self.native_rate, self.config.sample_rate),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut wav_bytes: Vec<u8> = Vec::new();
        {
            let cursor = Cursor::new(&mut wav_bytes);
            let mut writer = hound::WavWriter::new(cursor, spec)
                .map_err(|e| CaptureError::Recorder(format!("WAV writer: {e}")))?;
            for &sample in &resampled {
                writer
                    .write_sample(sample)
                    .map_err(|e| CaptureError::Recorder(format!("WAV sample: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| CaptureError::Recorder(format!("WAV finalize: {e}")))?;
        }

        Ok(wav_bytes)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn acquire(&mut self, constraints: DeviceConstraints) -> Result<LiveStream, CaptureError> {
        if constraints.video {
            return Err(CaptureError::Unsupported(
                "microphone device cannot provide a video track".to_string(),
            ));
        }
        if self.live {
            return Err(CaptureError::Recorder("device already acquired".to_string()));
        }

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::PermissionDenied("no input device available".to_string())
        })?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::PermissionDenied(format!("input config: {e}")))?;

        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();
        self.native_rate = stream_config.sample_rate.0;
        self.native_channels = stream_config.channels;

        info!(
            device = %device_name,
            native_rate = self.native_rate,
            native_channels = self.native_channels,
            "acquiring microphone"
        );

        self.samples = Arc::new(Mutex::new(Vec::new()));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&device, &stream_config, Arc::clone(&self.samples))?
            }
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&device, &stream_config, Arc::clone(&self.samples))?
            }
            cpal::SampleFormat::U16 => {
                build_input_stream::<u16>(&device, &stream_config, Arc::clone(&self.samples))?
            }
            other => {
                return Err(CaptureError::Unsupported(format!(
                    "input sample format {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| CaptureError::PermissionDenied(format!("stream start: {e}")))?;

        let (tx, rx) = mpsc::channel(4);
        self.stream = Some(SendStream(stream));
        self.chunk_tx = Some(tx);
        self.started = Some(Instant::now());
        self.live = true;

        Ok(LiveStream {
            mime_type: "audio/wav".to_string(),
            kind: MediaKind::Audio,
            rx,
        })
    }

    async fn release(&mut self) -> Result<(), CaptureError> {
        if !self.live {
            return Ok(());
        }
        self.live = false;

        // Stop the hardware before reading the buffer back.
        drop(self.stream.take());

        let elapsed_ms = self
            .started
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let wav = self.finalize_wav()?;
        info!(bytes = wav.len(), elapsed_ms, "microphone released");

        if let Some(tx) = self.chunk_tx.take() {
            let _ = tx
                .send(MediaChunk {
                    data: wav,
                    timestamp_ms: elapsed_ms,
                })
                .await;
            // Dropping the sender closes the stream channel.
        }

        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut guard = match samples.lock() {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.extend(data.iter().map(|s| i16::from_sample(*s)));
            },
            move |err| {
                error!("input stream error: {err}");
            },
            None,
        )
        .map_err(|e| CaptureError::PermissionDenied(format!("input stream: {e}")))
}

/// Sum interleaved channels down to mono when the target asks for fewer
/// channels than the hardware delivers. Only the stereo path is supported.
fn downmix(samples: &[i16], native_channels: u16, target_channels: u16) -> Vec<i16> {
    if native_channels <= 1 || target_channels != 1 || native_channels != 2 {
        return samples.to_vec();
    }

    let mut mono = Vec::with_capacity(samples.len() / 2);
    for frame in samples.chunks_exact(2) {
        let sum = frame[0] as i32 + frame[1] as i32;
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    mono
}

/// Downsample by decimation, matching the whole-ratio scheme used elsewhere
/// in the pipeline. Upsampling is never attempted.
fn decimate(samples: &[i16], native_rate: u32, target_rate: u32) -> Vec<i16> {
    if native_rate == 0 || target_rate == 0 || native_rate <= target_rate {
        return samples.to_vec();
    }

    let ratio = native_rate / target_rate;
    if ratio <= 1 {
        return samples.to_vec();
    }

    samples.iter().step_by(ratio as usize).copied().collect()
}

fn effective_rate(native_rate: u32, target_rate: u32) -> u32 {
    if native_rate == 0 || native_rate <= target_rate {
        return if native_rate == 0 { target_rate } else { native_rate };
    }
    let ratio = native_rate / target_rate;
    if ratio <= 1 {
        native_rate
    } else {
        native_rate / ratio
    }
}
