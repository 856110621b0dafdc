use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::playback::AudioClip;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log.
///
/// Turns are appended, never mutated or removed. The optional clip is a
/// back-reference for replay; the active playback resource is owned by the
/// playback manager, not by the turn.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub audio: Option<AudioClip>,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            audio: None,
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            audio: None,
            at: Utc::now(),
        }
    }

    pub fn assistant_with_audio(content: impl Into<String>, audio: Option<AudioClip>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            audio,
            at: Utc::now(),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// Append-only, insertion-ordered conversation log with an observable length.
#[derive(Clone)]
pub struct Transcript {
    turns: Arc<Mutex<Vec<ConversationTurn>>>,
    len_tx: Arc<watch::Sender<usize>>,
}

impl Transcript {
    /// Create a transcript, optionally seeded with an assistant greeting.
    pub fn new(greeting: Option<String>) -> Self {
        let mut turns = Vec::new();
        if let Some(greeting) = greeting {
            turns.push(ConversationTurn::assistant(greeting));
        }
        let (len_tx, _) = watch::channel(turns.len());

        Self {
            turns: Arc::new(Mutex::new(turns)),
            len_tx: Arc::new(len_tx),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ConversationTurn>> {
        match self.turns.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append one turn.
    pub fn push(&self, turn: ConversationTurn) {
        let mut turns = self.lock();
        turns.push(turn);
        let _ = self.len_tx.send(turns.len());
    }

    /// Append a user/assistant pair atomically, user first.
    pub fn push_exchange(&self, user: ConversationTurn, assistant: ConversationTurn) {
        let mut turns = self.lock();
        turns.push(user);
        turns.push(assistant);
        let _ = self.len_tx.send(turns.len());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.lock().clone()
    }

    pub fn get(&self, index: usize) -> Option<ConversationTurn> {
        self.lock().get(index).cloned()
    }

    /// Observable length; UI layers watch this instead of polling.
    pub fn watch_len(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}
