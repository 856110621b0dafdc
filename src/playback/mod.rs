//! Audio playback with supersession semantics
//!
//! One `PlaybackManager` per surface guarantees at most one active playback
//! at a time: starting a new clip stops and releases the previous one first,
//! and every playable resource is released exactly once whether playback
//! completed, errored, was stopped, or was superseded.

pub mod manager;
pub mod output;
pub mod rodio_out;

pub use manager::{PlaybackDone, PlaybackManager};
pub use output::{AudioClip, AudioOutput, NullOutput, PlaybackControl, PlaybackOutcome};
pub use rodio_out::RodioOutput;
