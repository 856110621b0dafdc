use serde::Serialize;

/// Where a conversational surface is in its turn cycle.
///
/// Exactly one of {user input, assistant output} may be active at a time;
/// Idle is the only state that accepts a new capture gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Recording,
    Uploading,
    Processing,
    Speaking,
    /// Terminal for the attempt; cleared by acknowledgement back to Idle.
    Error,
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::Idle
    }
}

impl TurnState {
    /// Whether a start-capture gesture is honored in this state.
    pub fn accepts_capture(self) -> bool {
        matches!(self, TurnState::Idle)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition(self, next: TurnState) -> bool {
        use TurnState::*;
        match (self, next) {
            (Idle, Recording) => true,
            (Recording, Uploading) => true,
            (Uploading, Processing) => true,
            // A reply with audio speaks; one without returns straight to Idle.
            (Processing, Speaking) => true,
            (Error, Idle) => true,
            // Any active stage may fail; completion and teardown land on Idle.
            (Recording | Uploading | Processing | Speaking, Error | Idle) => true,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Recording => "recording",
            TurnState::Uploading => "uploading",
            TurnState::Processing => "processing",
            TurnState::Speaking => "speaking",
            TurnState::Error => "error",
        }
    }
}
