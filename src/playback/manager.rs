use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use super::output::{AudioClip, AudioOutput, PlaybackControl, PlaybackOutcome};
use crate::error::PlaybackError;

struct ActivePlayback {
    id: u64,
    control: Box<dyn PlaybackControl>,
}

/// Resolves when the associated playback ends: naturally, by explicit stop,
/// or by supersession.
pub struct PlaybackDone {
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackDone {
    pub async fn wait(self) -> PlaybackOutcome {
        // A dropped sender means the output died without resolving.
        self.rx.await.unwrap_or(PlaybackOutcome::Failed)
    }
}

/// At most one playback is active per manager. Starting a new clip stops and
/// releases the previous one first (supersession); `stop()` is idempotent.
pub struct PlaybackManager {
    output: Arc<dyn AudioOutput>,
    current: Mutex<Option<ActivePlayback>>,
    next_id: AtomicU64,
}

impl PlaybackManager {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Begin playing a clip, superseding any active playback.
    pub fn play(&self, clip: AudioClip) -> Result<PlaybackDone, PlaybackError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (done_tx, done_rx) = oneshot::channel();

        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = current.take() {
            debug!(superseded = previous.id, by = id, "stopping previous playback");
            previous.control.stop();
        }

        let control = self.output.start(clip, done_tx)?;
        *current = Some(ActivePlayback { id, control });

        Ok(PlaybackDone { rx: done_rx })
    }

    /// Halt the active playback, if any. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(active) = current.take() {
            debug!(playback = active.id, "stopping playback");
            active.control.stop();
        }
    }

    /// Whether a playback slot is occupied (it may have finished naturally
    /// without being collected yet).
    pub fn has_active_slot(&self) -> bool {
        match self.current.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}
