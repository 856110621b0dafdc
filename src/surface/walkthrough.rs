use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::capture::{
    CaptureDeviceFactory, CaptureConfig, CaptureSession, DeviceConstraints, DeviceProvider,
    DeviceSource,
};
use crate::error::TurnError;
use crate::turn::Gesture;
use crate::upload::AnalysisBackend;

/// Walkthrough recording states. There is no playback phase here, so the
/// machine is the reduced Idle/Recording/Uploading/Done cycle; failures
/// return to Idle so the user can retake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkthroughState {
    Idle,
    Recording,
    Uploading,
    Done,
}

impl WalkthroughState {
    pub fn label(self) -> &'static str {
        match self {
            WalkthroughState::Idle => "idle",
            WalkthroughState::Recording => "recording",
            WalkthroughState::Uploading => "uploading",
            WalkthroughState::Done => "done",
        }
    }
}

struct Inner {
    session: Option<CaptureSession>,
    acquiring: bool,
    /// Bumped on start and reset; stale upload results are discarded.
    attempt: u64,
    report_id: Option<String>,
    last_error: Option<TurnError>,
}

/// Deposit walkthrough surface: record (or batch-stream) an audio+video
/// payload and upload it for defect analysis.
pub struct WalkthroughSurface {
    backend: Arc<dyn AnalysisBackend>,
    devices: Arc<dyn DeviceProvider>,
    capture_config: CaptureConfig,
    state_tx: watch::Sender<WalkthroughState>,
    inner: Mutex<Inner>,
}

impl WalkthroughSurface {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        devices: Arc<dyn DeviceProvider>,
        capture_config: CaptureConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(WalkthroughState::Idle);

        Self {
            backend,
            devices,
            capture_config,
            state_tx,
            inner: Mutex::new(Inner {
                session: None,
                acquiring: false,
                attempt: 0,
                report_id: None,
                last_error: None,
            }),
        }
    }

    pub fn current_state(&self) -> WalkthroughState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<WalkthroughState> {
        self.state_tx.subscribe()
    }

    pub async fn report_id(&self) -> Option<String> {
        self.inner.lock().await.report_id.clone()
    }

    pub async fn last_error(&self) -> Option<TurnError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Start recording. Only honored from Idle; `source` overrides the
    /// default device (e.g. a pre-recorded file for batch upload).
    pub async fn start_capture(&self, source: Option<DeviceSource>) -> Result<Gesture, TurnError> {
        let expected_attempt = {
            let mut inner = self.inner.lock().await;
            if self.current_state() != WalkthroughState::Idle || inner.acquiring {
                debug!(state = self.current_state().label(), "walkthrough start ignored");
                return Ok(Gesture::Ignored);
            }
            inner.acquiring = true;
            inner.last_error = None;
            inner.attempt
        };

        let opened = {
            let device = match source {
                Some(source) => CaptureDeviceFactory::create(&source, &self.capture_config),
                None => self.devices.open(),
            };
            match device {
                Ok(device) => CaptureSession::open(device, DeviceConstraints::audio_video()).await,
                Err(e) => Err(e),
            }
        };

        let mut inner = self.inner.lock().await;
        inner.acquiring = false;

        if inner.attempt != expected_attempt {
            warn!("discarding walkthrough capture acquired across a reset");
            return Ok(Gesture::Ignored);
        }

        match opened {
            Ok(session) => {
                inner.attempt += 1;
                info!(session = %session.id(), "walkthrough recording started");
                inner.session = Some(session);
                self.state_tx.send_replace(WalkthroughState::Recording);
                Ok(Gesture::Accepted)
            }
            Err(e) => {
                let err = TurnError::from(e);
                warn!(error = %err, "walkthrough device acquisition failed");
                inner.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Stop recording, finalize, and upload the walkthrough.
    pub async fn stop_capture(&self) -> Result<Gesture, TurnError> {
        let (session, attempt) = {
            let mut inner = self.inner.lock().await;
            if self.current_state() != WalkthroughState::Recording {
                debug!("walkthrough stop ignored");
                return Ok(Gesture::Ignored);
            }
            let session = match inner.session.take() {
                Some(session) => session,
                None => return Ok(Gesture::Ignored),
            };
            self.state_tx.send_replace(WalkthroughState::Uploading);
            (session, inner.attempt)
        };

        let payload = match session.stop().await {
            Ok(payload) => payload,
            Err(e) => return self.fail(attempt, TurnError::from(e)).await,
        };
        debug!(bytes = payload.len(), mime = payload.mime_type(), "walkthrough finalized");

        let reply = match self.backend.deposit_upload(&payload).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(attempt, TurnError::from(e)).await,
        };

        let mut inner = self.inner.lock().await;
        if inner.attempt != attempt {
            warn!("discarding stale walkthrough result");
            return Ok(Gesture::Accepted);
        }

        info!(report_id = %reply.report_id, "walkthrough report ready");
        inner.report_id = Some(reply.report_id);
        self.state_tx.send_replace(WalkthroughState::Done);
        Ok(Gesture::Accepted)
    }

    /// Retake: drop any result or active recording and return to Idle.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.attempt += 1;
        inner.report_id = None;
        inner.last_error = None;
        if let Some(session) = inner.session.take() {
            info!(session = %session.id(), "abandoning walkthrough recording");
            drop(session);
        }
        self.state_tx.send_replace(WalkthroughState::Idle);
    }

    /// Failures are recoverable: record the error and return to Idle.
    async fn fail(&self, attempt: u64, err: TurnError) -> Result<Gesture, TurnError> {
        let mut inner = self.inner.lock().await;
        if inner.attempt != attempt {
            warn!("discarding stale walkthrough failure");
            return Ok(Gesture::Accepted);
        }
        warn!(error = %err, "walkthrough attempt failed");
        inner.last_error = Some(err.clone());
        self.state_tx.send_replace(WalkthroughState::Idle);
        Err(err)
    }
}
