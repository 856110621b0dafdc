use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::device::{CaptureDevice, DeviceConstraints};
use super::payload::{CapturePayload, MediaKind};
use crate::error::CaptureError;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Acquiring,
    Recording,
    Finalizing,
}

/// One acquire → record → finalize → release lifecycle.
///
/// The session exclusively owns its device handle. The handle is released
/// exactly once on every exit path: `stop()` releases it before finalizing,
/// and dropping an un-stopped session releases it from `Drop`.
pub struct CaptureSession {
    id: Uuid,
    state: SessionState,
    device: Option<Box<dyn CaptureDevice>>,
    mime_type: String,
    kind: MediaKind,
    collector: Option<JoinHandle<Vec<Vec<u8>>>>,
}

impl CaptureSession {
    /// Acquire the device and start recording.
    ///
    /// Suspends while the platform permission prompt is open. On acquisition
    /// failure no session exists and there is nothing to release.
    pub async fn open(
        mut device: Box<dyn CaptureDevice>,
        constraints: DeviceConstraints,
    ) -> Result<Self, CaptureError> {
        let id = Uuid::new_v4();
        debug!(session = %id, device = device.name(), state = ?SessionState::Acquiring, "opening capture session");

        let stream = device.acquire(constraints).await?;
        let mime_type = stream.mime_type;
        let kind = stream.kind;
        let mut rx = stream.rx;

        // Chunks append in arrival order; empty fragments are dropped. The
        // task ends when the device releases and closes the channel.
        let collector = tokio::spawn(async move {
            let mut chunks: Vec<Vec<u8>> = Vec::new();
            while let Some(chunk) = rx.recv().await {
                if !chunk.data.is_empty() {
                    chunks.push(chunk.data);
                }
            }
            chunks
        });

        info!(session = %id, mime = %mime_type, kind = kind.label(), "recording");

        Ok(Self {
            id,
            state: SessionState::Recording,
            device: Some(device),
            mime_type,
            kind,
            collector: Some(collector),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Stop recording and finalize the payload.
    ///
    /// Releases the device (flushing its buffered data into the stream),
    /// drains the collector, and concatenates the fragments into a single
    /// immutable payload. Zero accumulated chunks still produce a payload.
    pub async fn stop(mut self) -> Result<CapturePayload, CaptureError> {
        self.state = SessionState::Finalizing;

        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.release().await {
                warn!(session = %self.id, "device release failed: {e}");
            }
        }

        let chunks = match self.collector.take() {
            Some(handle) => match handle.await {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(session = %self.id, "chunk collector panicked: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in &chunks {
            bytes.extend_from_slice(chunk);
        }

        self.state = SessionState::Idle;
        info!(
            session = %self.id,
            chunks = chunks.len(),
            bytes = bytes.len(),
            "capture session finalized"
        );

        Ok(CapturePayload::new(bytes, self.mime_type.clone(), self.kind))
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.collector.take() {
            handle.abort();
        }

        // Teardown without stop(): release the device so hardware is never
        // leaked across sessions. Best-effort when no runtime is available.
        if let Some(mut device) = self.device.take() {
            if device.is_live() {
                let id = self.id;
                match tokio::runtime::Handle::try_current() {
                    Ok(rt) => {
                        rt.spawn(async move {
                            if let Err(e) = device.release().await {
                                warn!(session = %id, "release on teardown failed: {e}");
                            }
                        });
                    }
                    Err(_) => {
                        warn!(session = %id, "capture session dropped outside a runtime; device not released");
                    }
                }
            }
        }
    }
}
