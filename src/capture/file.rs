use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::device::{CaptureDevice, DeviceConstraints, LiveStream, MediaChunk};
use super::payload::MediaKind;
use crate::error::CaptureError;

/// Bytes per chunk when streaming a file.
const CHUNK_BYTES: usize = 32 * 1024;

/// File-backed capture device.
///
/// Streams a pre-recorded file through the chunk channel, for tests and for
/// batch upload of an existing recording (e.g. a walkthrough video picked by
/// the UI). Release flushes whatever the feeder has left, so a stop always
/// finalizes the complete file.
pub struct FileDevice {
    path: PathBuf,
    mime_type: String,
    feeder: Option<JoinHandle<()>>,
    live: bool,
}

impl FileDevice {
    pub fn new(path: PathBuf, mime_type: String) -> Self {
        Self {
            path,
            mime_type,
            feeder: None,
            live: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileDevice {
    async fn acquire(&mut self, constraints: DeviceConstraints) -> Result<LiveStream, CaptureError> {
        let kind = MediaKind::from_mime(&self.mime_type);
        if constraints.video && kind != MediaKind::Video {
            return Err(CaptureError::Unsupported(format!(
                "{} holds no video track",
                self.path.display()
            )));
        }
        if self.live {
            return Err(CaptureError::Recorder("device already acquired".to_string()));
        }

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::PermissionDenied(format!(
                "cannot open capture source {}: {e}",
                self.path.display()
            ))
        })?;

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            mime = %self.mime_type,
            "streaming file capture source"
        );

        let (tx, rx) = mpsc::channel(8);
        let started = std::time::Instant::now();

        let feeder = tokio::spawn(async move {
            for chunk in bytes.chunks(CHUNK_BYTES) {
                let frame = MediaChunk {
                    data: chunk.to_vec(),
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        self.feeder = Some(feeder);
        self.live = true;

        Ok(LiveStream {
            mime_type: self.mime_type.clone(),
            kind,
            rx,
        })
    }

    async fn release(&mut self) -> Result<(), CaptureError> {
        if !self.live {
            return Ok(());
        }
        self.live = false;

        if let Some(feeder) = self.feeder.take() {
            // Flush: the feeder drains into the stream channel, which the
            // session's collector is still consuming at this point. If the
            // consumer is already gone the pending send fails and the feeder
            // exits on its own.
            let _ = feeder.await;
        }

        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn name(&self) -> &str {
        "file"
    }
}
