//! Turn-taking: one state machine per conversational surface
//!
//! This module enforces the ordering discipline of the conversational
//! surfaces: exactly one of {user recording, upload in flight, assistant
//! speaking} is active at a time, and a new recording can only begin from
//! Idle. The `TurnFlow` seam is what differs between surfaces: which
//! backend operation a finalized payload is submitted to and how the reply
//! maps onto transcript turns.

pub mod controller;
pub mod state;
pub mod transcript;

pub use controller::{Gesture, TurnEvent, TurnTakingController};
pub use state::TurnState;
pub use transcript::{ConversationTurn, Role, Transcript};

use crate::capture::CapturePayload;
use crate::error::UploadError;
use crate::playback::AudioClip;

/// What one completed round trip contributes to the conversation.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// What the backend heard the user say (the user turn's content).
    pub heard: String,
    /// The assistant turn's content.
    pub answer: String,
    /// Spoken form of the answer, when available.
    pub speech: Option<AudioClip>,
}

/// Surface-specific half of a turn: submit the finalized payload and shape
/// the reply. Implementations may stash richer, surface-specific results
/// (structured requests, PDFs) on the side.
#[async_trait::async_trait]
pub trait TurnFlow: Send + Sync {
    async fn submit(&self, payload: CapturePayload) -> Result<TurnReply, UploadError>;

    /// Assistant turn appended when a round trip fails.
    fn fallback_text(&self) -> &str {
        "Sorry, I couldn't process that. Please try again."
    }
}
