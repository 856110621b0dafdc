use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use super::state::TurnState;
use super::transcript::{ConversationTurn, Transcript};
use super::TurnFlow;
use crate::capture::{CaptureSession, DeviceConstraints, DeviceProvider};
use crate::error::TurnError;
use crate::playback::PlaybackManager;

/// What became of a start/stop gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Accepted,
    /// The controller was busy (or idle, for a stop); nothing changed.
    Ignored,
}

/// Events broadcast to observers; the exact transition sequence, unlike the
/// watch channel which only carries the latest state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    StateChanged { from: TurnState, to: TurnState },
    TurnStarted { turn: u64 },
    TurnCompleted { turn: u64 },
    TurnFailed { turn: u64, error: String },
}

struct Inner {
    session: Option<CaptureSession>,
    /// A permission prompt is open; gestures are ignored until it resolves.
    acquiring: bool,
    /// Monotonic turn counter. Bumped when a recording starts and on reset,
    /// so a slow response landing after a reset is recognizably stale.
    turn_seq: u64,
    last_error: Option<TurnError>,
}

/// The single gatekeeper of one conversational surface.
///
/// Enforces mutual exclusion between user input and assistant output: a new
/// capture may only begin from Idle, and a turn runs
/// Recording → Uploading → Processing → (Speaking →) Idle before the next
/// gesture is honored.
pub struct TurnTakingController {
    name: String,
    devices: Arc<dyn DeviceProvider>,
    constraints: DeviceConstraints,
    flow: Arc<dyn TurnFlow>,
    playback: Arc<PlaybackManager>,
    transcript: Transcript,
    state_tx: watch::Sender<TurnState>,
    events_tx: broadcast::Sender<TurnEvent>,
    inner: Mutex<Inner>,
}

impl TurnTakingController {
    pub fn new(
        name: impl Into<String>,
        devices: Arc<dyn DeviceProvider>,
        constraints: DeviceConstraints,
        flow: Arc<dyn TurnFlow>,
        playback: Arc<PlaybackManager>,
        transcript: Transcript,
    ) -> Self {
        let (state_tx, _) = watch::channel(TurnState::Idle);
        let (events_tx, _) = broadcast::channel(64);

        Self {
            name: name.into(),
            devices,
            constraints,
            flow,
            playback,
            transcript,
            state_tx,
            events_tx,
            inner: Mutex::new(Inner {
                session: None,
                acquiring: false,
                turn_seq: 0,
                last_error: None,
            }),
        }
    }

    pub fn current_state(&self) -> TurnState {
        *self.state_tx.borrow()
    }

    /// Observable current state.
    pub fn watch_state(&self) -> watch::Receiver<TurnState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to the transition/event stream.
    pub fn events(&self) -> broadcast::Receiver<TurnEvent> {
        self.events_tx.subscribe()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn last_error(&self) -> Option<TurnError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Transition the published state. Callers hold the inner lock.
    fn set_state(&self, to: TurnState) {
        let from = *self.state_tx.borrow();
        if from == to {
            return;
        }
        if !from.can_transition(to) {
            warn!(surface = %self.name, from = from.label(), to = to.label(), "irregular state transition");
        }
        self.state_tx.send_replace(to);
        let _ = self.events_tx.send(TurnEvent::StateChanged { from, to });
    }

    /// Honor a start gesture if and only if the surface is Idle.
    ///
    /// Suspends while the permission prompt is open. On denial the state
    /// stays Idle and the error is recorded for the surface to show.
    pub async fn start_capture(&self) -> Result<Gesture, TurnError> {
        let expected_seq = {
            let mut inner = self.inner.lock().await;
            let state = self.current_state();
            if !state.accepts_capture() || inner.acquiring || inner.session.is_some() {
                debug!(surface = %self.name, state = state.label(), "start gesture ignored");
                return Ok(Gesture::Ignored);
            }
            inner.acquiring = true;
            inner.last_error = None;
            inner.turn_seq
        };

        let opened = match self.devices.open() {
            Ok(device) => CaptureSession::open(device, self.constraints).await,
            Err(e) => Err(e),
        };

        let mut inner = self.inner.lock().await;
        inner.acquiring = false;

        if inner.turn_seq != expected_seq {
            // Reset raced the permission prompt; whatever we acquired is
            // torn down again (the session's Drop releases the device).
            warn!(surface = %self.name, "discarding capture acquired across a reset");
            return Ok(Gesture::Ignored);
        }

        match opened {
            Ok(session) => {
                inner.turn_seq += 1;
                let turn = inner.turn_seq;
                info!(surface = %self.name, turn, session = %session.id(), "recording started");
                inner.session = Some(session);
                self.set_state(TurnState::Recording);
                let _ = self.events_tx.send(TurnEvent::TurnStarted { turn });
                Ok(Gesture::Accepted)
            }
            Err(e) => {
                let err = TurnError::from(e);
                warn!(surface = %self.name, error = %err, "device acquisition failed");
                inner.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Honor a stop gesture and drive the turn to completion: finalize the
    /// payload, upload it, append the transcript exchange, and play the
    /// spoken reply before returning to Idle.
    pub async fn stop_capture(&self) -> Result<Gesture, TurnError> {
        let (session, turn) = {
            let mut inner = self.inner.lock().await;
            if self.current_state() != TurnState::Recording {
                debug!(surface = %self.name, "stop gesture ignored");
                return Ok(Gesture::Ignored);
            }
            let session = match inner.session.take() {
                Some(session) => session,
                None => return Ok(Gesture::Ignored),
            };
            self.set_state(TurnState::Uploading);
            (session, inner.turn_seq)
        };

        let payload = match session.stop().await {
            Ok(payload) => payload,
            Err(e) => return self.fail_turn(turn, TurnError::from(e), false).await,
        };
        debug!(
            surface = %self.name,
            turn,
            bytes = payload.len(),
            mime = payload.mime_type(),
            "payload finalized"
        );

        {
            let inner = self.inner.lock().await;
            if inner.turn_seq != turn {
                return self.discard_stale(turn);
            }
            self.set_state(TurnState::Processing);
        }

        let reply = match self.flow.submit(payload).await {
            Ok(reply) => reply,
            Err(e) => return self.fail_turn(turn, TurnError::from(e), true).await,
        };

        let speech = {
            let inner = self.inner.lock().await;
            if inner.turn_seq != turn {
                return self.discard_stale(turn);
            }
            // User turn before assistant turn, appended under one lock.
            self.transcript.push_exchange(
                ConversationTurn::user(reply.heard.clone()),
                ConversationTurn::assistant_with_audio(reply.answer.clone(), reply.speech.clone()),
            );
            reply.speech
        };

        if let Some(clip) = speech {
            let done = {
                let inner = self.inner.lock().await;
                if inner.turn_seq != turn {
                    return self.discard_stale(turn);
                }
                match self.playback.play(clip) {
                    Ok(done) => {
                        self.set_state(TurnState::Speaking);
                        Some(done)
                    }
                    Err(e) => {
                        // Playback failures never block the conversation.
                        warn!(surface = %self.name, turn, error = %e, "playback failed, continuing without audio");
                        None
                    }
                }
            };

            if let Some(done) = done {
                let outcome = done.wait().await;
                debug!(surface = %self.name, turn, ?outcome, "playback finished");
            }
        }

        let inner = self.inner.lock().await;
        if inner.turn_seq == turn {
            self.set_state(TurnState::Idle);
            info!(surface = %self.name, turn, "turn completed");
            let _ = self.events_tx.send(TurnEvent::TurnCompleted { turn });
        }
        Ok(Gesture::Accepted)
    }

    /// Clear an acknowledged error, returning the surface to Idle.
    pub async fn acknowledge_error(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.current_state() != TurnState::Error {
            return false;
        }
        inner.last_error = None;
        self.set_state(TurnState::Idle);
        true
    }

    /// Tear down whatever is in flight: drop an active recording (releasing
    /// its device), stop playback, invalidate pending responses, and return
    /// to Idle.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.turn_seq += 1;
        inner.last_error = None;
        if let Some(session) = inner.session.take() {
            info!(surface = %self.name, session = %session.id(), "abandoning active recording");
            drop(session);
        }
        self.playback.stop();
        self.set_state(TurnState::Idle);
    }

    fn discard_stale(&self, turn: u64) -> Result<Gesture, TurnError> {
        warn!(surface = %self.name, turn, "discarding stale turn result");
        Ok(Gesture::Accepted)
    }

    async fn fail_turn(
        &self,
        turn: u64,
        err: TurnError,
        append_fallback: bool,
    ) -> Result<Gesture, TurnError> {
        let mut inner = self.inner.lock().await;
        if inner.turn_seq != turn {
            return self.discard_stale(turn);
        }

        warn!(surface = %self.name, turn, error = %err, "turn failed");
        if append_fallback {
            self.transcript
                .push(ConversationTurn::assistant(self.flow.fallback_text()));
        }
        inner.last_error = Some(err.clone());
        self.set_state(TurnState::Error);
        let _ = self.events_tx.send(TurnEvent::TurnFailed {
            turn,
            error: err.to_string(),
        });
        Err(err)
    }
}
