use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::info;

use crate::capture::{CapturePayload, DeviceConstraints, DeviceProvider};
use crate::error::{TurnError, UploadError};
use crate::playback::PlaybackManager;
use crate::turn::{Gesture, Transcript, TurnFlow, TurnReply, TurnTakingController};
use crate::upload::{AnalysisBackend, MaintenanceDetails, MaintenanceReply};

/// Voice maintenance reporting: describe the issue out loud, get back a
/// structured request, a formal letter PDF, and a spoken summary.
///
/// Tap-to-start / tap-to-stop toggling goes through the same start/stop
/// entry points as press-and-hold, so finalize-and-release guarantees are
/// identical.
pub struct MaintenanceSurface {
    controller: TurnTakingController,
    flow: Arc<MaintenanceFlow>,
}

struct MaintenanceFlow {
    backend: Arc<dyn AnalysisBackend>,
    details: Mutex<MaintenanceDetails>,
    latest: watch::Sender<Option<MaintenanceReply>>,
}

#[async_trait::async_trait]
impl TurnFlow for MaintenanceFlow {
    async fn submit(&self, payload: CapturePayload) -> Result<TurnReply, UploadError> {
        let details = {
            let guard = match self.details.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };

        let reply = self.backend.maintenance_report(&payload, &details).await?;

        // Same sentence the backend speaks in its audio summary.
        let summary = format!(
            "Maintenance request created: {} (urgency: {}).",
            reply.request.title, reply.request.urgency
        );
        let turn_reply = TurnReply {
            heard: reply.transcript.clone(),
            answer: summary,
            speech: reply.speech.clone(),
        };

        let _ = self.latest.send(Some(reply));
        Ok(turn_reply)
    }

    fn fallback_text(&self) -> &str {
        "Failed to process your report. Please try again."
    }
}

impl MaintenanceSurface {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        devices: Arc<dyn DeviceProvider>,
        playback: Arc<PlaybackManager>,
    ) -> Self {
        let (latest, _) = watch::channel(None);
        let flow = Arc::new(MaintenanceFlow {
            backend,
            details: Mutex::new(MaintenanceDetails::default()),
            latest,
        });
        let controller = TurnTakingController::new(
            "maintenance",
            devices,
            DeviceConstraints::audio_only(),
            Arc::clone(&flow) as Arc<dyn TurnFlow>,
            playback,
            Transcript::new(None),
        );

        Self { controller, flow }
    }

    /// Set the tenant/landlord/address context sent with the next report.
    pub fn set_details(&self, details: MaintenanceDetails) {
        info!(tenant = %details.tenant_name, "maintenance details updated");
        let mut guard = match self.flow.details.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = details;
    }

    pub async fn start_capture(&self) -> Result<Gesture, TurnError> {
        self.controller.start_capture().await
    }

    pub async fn stop_capture(&self) -> Result<Gesture, TurnError> {
        self.controller.stop_capture().await
    }

    pub async fn acknowledge_error(&self) -> bool {
        self.controller.acknowledge_error().await
    }

    /// Discard the current result and start over ("New" in the UI).
    pub async fn reset(&self) {
        self.controller.reset().await;
        let _ = self.flow.latest.send(None);
    }

    pub fn controller(&self) -> &TurnTakingController {
        &self.controller
    }

    /// Observable latest structured result.
    pub fn watch_result(&self) -> watch::Receiver<Option<MaintenanceReply>> {
        self.flow.latest.subscribe()
    }

    pub fn latest_result(&self) -> Option<MaintenanceReply> {
        self.flow.latest.borrow().clone()
    }
}
