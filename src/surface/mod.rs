//! The three capture surfaces
//!
//! Chat and maintenance are conversational (full turn-taking cycle with
//! playback); the walkthrough is record-and-upload only.

pub mod chat;
pub mod maintenance;
pub mod walkthrough;

pub use chat::VoiceChatSurface;
pub use maintenance::MaintenanceSurface;
pub use walkthrough::{WalkthroughState, WalkthroughSurface};
