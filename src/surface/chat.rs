use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::capture::{CapturePayload, DeviceConstraints, DeviceProvider};
use crate::error::{PlaybackError, TurnError, UploadError};
use crate::playback::PlaybackManager;
use crate::turn::{
    ConversationTurn, Gesture, Transcript, TurnFlow, TurnReply, TurnState, TurnTakingController,
};
use crate::upload::AnalysisBackend;

/// Voice Q&A chat: record a question, hear the answer, keep the exchange in
/// an ordered transcript.
pub struct VoiceChatSurface {
    controller: TurnTakingController,
    playback: Arc<PlaybackManager>,
    flow: Arc<ChatFlow>,
}

struct ChatFlow {
    backend: Arc<dyn AnalysisBackend>,
    lease_id: Mutex<Option<String>>,
}

#[async_trait::async_trait]
impl TurnFlow for ChatFlow {
    async fn submit(&self, payload: CapturePayload) -> Result<TurnReply, UploadError> {
        let lease_id = {
            let guard = match self.lease_id.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };

        let reply = self
            .backend
            .voice_chat(&payload, lease_id.as_deref())
            .await?;

        Ok(TurnReply {
            heard: reply.transcript,
            answer: reply.answer,
            speech: reply.speech,
        })
    }
}

impl VoiceChatSurface {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        devices: Arc<dyn DeviceProvider>,
        playback: Arc<PlaybackManager>,
        greeting: Option<String>,
    ) -> Self {
        let flow = Arc::new(ChatFlow {
            backend,
            lease_id: Mutex::new(None),
        });
        let transcript = Transcript::new(greeting);
        let controller = TurnTakingController::new(
            "chat",
            devices,
            DeviceConstraints::audio_only(),
            Arc::clone(&flow) as Arc<dyn TurnFlow>,
            Arc::clone(&playback),
            transcript,
        );

        Self {
            controller,
            playback,
            flow,
        }
    }

    /// Associate (or clear) the lease the next questions are about.
    pub fn set_lease(&self, lease_id: Option<String>) {
        info!(?lease_id, "chat lease association updated");
        let mut guard = match self.flow.lease_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = lease_id;
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

    pub async fn reset(&self) {
        self.controller.reset().await
    }

    pub fn controller(&self) -> &TurnTakingController {
        &self.controller
    }

    pub fn transcript(&self) -> &Transcript {
        self.controller.transcript()
    }

    /// Replay a stored assistant clip. Only honored while Idle; the playback
    /// manager's supersession still applies if replays overlap.
    pub fn replay(&self, index: usize) -> Result<bool, PlaybackError> {
        if self.controller.current_state() != TurnState::Idle {
            debug!(index, "replay ignored while surface is busy");
            return Ok(false);
        }

        let clip = match self.controller.transcript().get(index) {
            Some(ConversationTurn {
                audio: Some(clip), ..
            }) => clip,
            _ => return Ok(false),
        };

        self.playback.play(clip)?;
        Ok(true)
    }
}
