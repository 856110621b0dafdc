use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::PlaybackError;

/// One decoded-and-playable audio payload.
///
/// Bytes are shared so transcript turns can keep a replayable back-reference
/// without owning the active playback resource.
#[derive(Clone)]
pub struct AudioClip {
    pub bytes: Arc<Vec<u8>>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "audio/mpeg")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// How one playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Ran to the end of the clip.
    Completed,
    /// Halted early (explicit stop or supersession).
    Stopped,
    /// The clip could not be decoded or the output died mid-play.
    Failed,
}

/// Control half of one in-flight playback.
///
/// `stop()` is idempotent; the implementation releases the underlying
/// resource exactly once no matter how many times it is called or whether
/// the playback already ended on its own.
pub trait PlaybackControl: Send + Sync {
    fn stop(&self);
}

/// Audio output seam.
///
/// Implementations start playing the clip and resolve `done` with the final
/// outcome exactly once: `RodioOutput` for real hardware, `NullOutput` for
/// headless runs, scripted outputs in tests.
pub trait AudioOutput: Send + Sync {
    fn start(
        &self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, PlaybackError>;
}

/// Output that completes every clip immediately without making sound.
pub struct NullOutput;

struct NullControl;

impl PlaybackControl for NullControl {
    fn stop(&self) {}
}

impl AudioOutput for NullOutput {
    fn start(
        &self,
        _clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, PlaybackError> {
        let _ = done.send(PlaybackOutcome::Completed);
        Ok(Box::new(NullControl))
    }
}
