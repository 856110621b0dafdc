// Integration tests for the turn-taking controller and the conversational
// surfaces built on it.
//
// The core invariant throughout: within one surface, turns are strictly
// sequential: a start gesture is honored only from Idle, and recording N+1
// cannot begin before upload/processing/playback of turn N has resolved.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{chat_reply, maintenance_reply, ManualOutput, MockBackend, ScriptedDevice, ScriptedProvider};
use leaseguard_voice::{
    AudioOutput, Gesture, MaintenanceSurface, NullOutput, PlaybackManager, Role, TurnError,
    TurnEvent, TurnState, UploadError, Urgency, VoiceChatSurface,
};

const GREETING: &str = "Hi! I'm LeaseGuard AI. Ask me anything about your lease or tenant rights.";

fn chat_surface(
    backend: Arc<MockBackend>,
    devices: Arc<ScriptedProvider>,
    output: Arc<dyn AudioOutput>,
    greeting: Option<&str>,
) -> Arc<VoiceChatSurface> {
    let playback = Arc::new(PlaybackManager::new(output));
    Arc::new(VoiceChatSurface::new(
        backend,
        devices,
        playback,
        greeting.map(str::to_string),
    ))
}

fn drain_states(events: &mut tokio::sync::broadcast::Receiver<TurnEvent>) -> Vec<TurnState> {
    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TurnEvent::StateChanged { to, .. } = event {
            states.push(to);
        }
    }
    states
}

async fn wait_for_state(
    rx: &mut tokio::sync::watch::Receiver<TurnState>,
    wanted: TurnState,
) -> TurnState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == wanted))
        .await
        .expect("timed out waiting for state")
        .map(|s| *s)
        .expect("state channel closed")
}

// ============================================================================
// Scenario A: happy path with audio
// ============================================================================

#[tokio::test]
async fn voice_question_round_trip_appends_two_turns_and_speaks() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_chat(Ok(chat_reply(
        "what's my late fee",
        "Your late fee is capped at 5% of monthly rent.",
        Some(vec![0xffu8; 320]),
    )));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        vec![b"voice-bytes".to_vec()],
        Arc::clone(&releases),
    )]));

    let chat = chat_surface(backend.clone(), devices, Arc::new(NullOutput), Some(GREETING));
    let mut events = chat.controller().events();

    assert_eq!(chat.transcript().len(), 1); // greeting

    assert_eq!(chat.start_capture().await.unwrap(), Gesture::Accepted);
    assert_eq!(chat.stop_capture().await.unwrap(), Gesture::Accepted);

    // Exactly two ordered turns appended: user first, assistant second.
    let turns = chat.transcript().snapshot();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].role, Role::User);
    assert_eq!(turns[1].content, "what's my late fee");
    assert_eq!(turns[2].role, Role::Assistant);
    assert_eq!(turns[2].content, "Your late fee is capped at 5% of monthly rent.");
    assert!(turns[2].has_audio());

    assert_eq!(
        drain_states(&mut events),
        vec![
            TurnState::Recording,
            TurnState::Uploading,
            TurnState::Processing,
            TurnState::Speaking,
            TurnState::Idle,
        ]
    );

    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(backend.upload_count(), 1);
    let upload = backend.uploads.lock().unwrap()[0].clone();
    assert_eq!(upload.endpoint, "chat");
    assert_eq!(upload.bytes, b"voice-bytes".len());
    assert_eq!(upload.mime_type, "audio/webm");
}

#[tokio::test]
async fn reply_without_audio_skips_speaking() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_chat(Ok(chat_reply("hello", "Hello there.", None)));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        vec![b"hi".to_vec()],
        Arc::clone(&releases),
    )]));
    let output = ManualOutput::new();

    let chat = chat_surface(backend, devices, Arc::new(output.clone()), None);
    let mut events = chat.controller().events();

    chat.start_capture().await.unwrap();
    chat.stop_capture().await.unwrap();

    assert_eq!(
        drain_states(&mut events),
        vec![
            TurnState::Recording,
            TurnState::Uploading,
            TurnState::Processing,
            TurnState::Idle,
        ]
    );
    assert_eq!(output.started(), 0);
}

// ============================================================================
// Scenario B: permission denied
// ============================================================================

#[tokio::test]
async fn permission_denied_leaves_surface_idle_with_actionable_message() {
    let backend = Arc::new(MockBackend::new());
    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::denied(
        Arc::clone(&releases),
    )]));

    let chat = chat_surface(backend.clone(), devices, Arc::new(NullOutput), Some(GREETING));

    let err = chat.start_capture().await.unwrap_err();
    assert!(matches!(
        err,
        TurnError::Capture(leaseguard_voice::CaptureError::PermissionDenied(_))
    ));

    assert_eq!(chat.controller().current_state(), TurnState::Idle);
    assert_eq!(chat.transcript().len(), 1); // untouched
    assert_eq!(
        chat.controller().last_error().await.unwrap().user_message(),
        "Microphone access is required. Please allow permissions."
    );
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    // No session exists, so a stop gesture has nothing to do.
    assert_eq!(chat.stop_capture().await.unwrap(), Gesture::Ignored);
    assert_eq!(backend.upload_count(), 0);
}

// ============================================================================
// Scenario C: backend failure
// ============================================================================

#[tokio::test]
async fn backend_failure_appends_fallback_turn_and_recovers_via_ack() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_chat(Err(UploadError::Status(500)));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        vec![b"question".to_vec()],
        Arc::clone(&releases),
    )]));
    let output = ManualOutput::new();

    let chat = chat_surface(backend, devices, Arc::new(output.clone()), Some(GREETING));

    chat.start_capture().await.unwrap();
    let err = chat.stop_capture().await.unwrap_err();
    assert!(matches!(err, TurnError::Upload(UploadError::Status(500))));

    // One assistant fallback turn, no playback attempted.
    let turns = chat.transcript().snapshot();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "Sorry, I couldn't process that. Please try again.");
    assert_eq!(output.started(), 0);

    // The device was still released exactly once.
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Error is terminal for the attempt; gestures are ignored until
    // acknowledged, then the user can record again.
    assert_eq!(chat.controller().current_state(), TurnState::Error);
    assert_eq!(chat.start_capture().await.unwrap(), Gesture::Ignored);
    assert!(chat.acknowledge_error().await);
    assert_eq!(chat.controller().current_state(), TurnState::Idle);
}

// ============================================================================
// Scenario D: zero bytes captured
// ============================================================================

#[tokio::test]
async fn stopping_an_empty_recording_still_uploads_a_payload() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_chat(Ok(chat_reply("", "I didn't catch that.", None)));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        Vec::new(),
        Arc::clone(&releases),
    )]));

    let chat = chat_surface(backend.clone(), devices, Arc::new(NullOutput), None);

    chat.start_capture().await.unwrap();
    assert_eq!(chat.stop_capture().await.unwrap(), Gesture::Accepted);

    assert_eq!(backend.upload_count(), 1);
    assert_eq!(backend.uploads.lock().unwrap()[0].bytes, 0);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Gesture gating
// ============================================================================

#[tokio::test]
async fn start_gesture_is_a_no_op_while_recording() {
    let backend = Arc::new(MockBackend::new());
    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![
        ScriptedDevice::audio(vec![b"a".to_vec()], Arc::clone(&releases)),
        ScriptedDevice::audio(vec![b"b".to_vec()], Arc::clone(&releases)),
    ]));

    let chat = chat_surface(backend, devices.clone(), Arc::new(NullOutput), None);

    assert_eq!(chat.start_capture().await.unwrap(), Gesture::Accepted);
    assert_eq!(chat.controller().current_state(), TurnState::Recording);

    // Second gesture: state unchanged, no new session created.
    assert_eq!(chat.start_capture().await.unwrap(), Gesture::Ignored);
    assert_eq!(chat.controller().current_state(), TurnState::Recording);
    assert_eq!(devices.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn start_gesture_is_a_no_op_while_speaking() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_chat(Ok(chat_reply("q", "a", Some(vec![1u8; 64]))));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![
        ScriptedDevice::audio(vec![b"a".to_vec()], Arc::clone(&releases)),
        ScriptedDevice::audio(vec![b"b".to_vec()], Arc::clone(&releases)),
    ]));
    let output = ManualOutput::new();

    let chat = chat_surface(backend, devices.clone(), Arc::new(output.clone()), None);
    let mut state_rx = chat.controller().watch_state();

    chat.start_capture().await.unwrap();
    let chat_bg = Arc::clone(&chat);
    let stop_task = tokio::spawn(async move { chat_bg.stop_capture().await });

    // The assistant is mid-sentence: the gesture must be ignored.
    wait_for_state(&mut state_rx, TurnState::Speaking).await;
    assert_eq!(chat.start_capture().await.unwrap(), Gesture::Ignored);
    assert_eq!(devices.opens.load(Ordering::SeqCst), 1);

    assert!(output.complete(0));
    assert_eq!(stop_task.await.unwrap().unwrap(), Gesture::Accepted);
    assert_eq!(chat.controller().current_state(), TurnState::Idle);
}

// ============================================================================
// Stale responses after a reset
// ============================================================================

#[tokio::test]
async fn response_arriving_after_reset_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    backend.set_delay(Duration::from_millis(200));
    backend.queue_chat(Ok(chat_reply("late", "too late", None)));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        vec![b"x".to_vec()],
        Arc::clone(&releases),
    )]));

    let chat = chat_surface(backend.clone(), devices, Arc::new(NullOutput), None);
    let mut state_rx = chat.controller().watch_state();

    chat.start_capture().await.unwrap();
    let chat_bg = Arc::clone(&chat);
    let stop_task = tokio::spawn(async move { chat_bg.stop_capture().await });

    wait_for_state(&mut state_rx, TurnState::Processing).await;
    chat.reset().await;
    assert_eq!(chat.controller().current_state(), TurnState::Idle);

    // The slow response lands, is recognized as stale, and changes nothing.
    assert_eq!(stop_task.await.unwrap().unwrap(), Gesture::Accepted);
    assert_eq!(chat.transcript().len(), 0);
    assert_eq!(chat.controller().current_state(), TurnState::Idle);
    assert_eq!(backend.upload_count(), 1);
}

// ============================================================================
// Scenario E: maintenance surface, tap-to-start / tap-to-stop
// ============================================================================

#[tokio::test]
async fn maintenance_toggle_produces_one_finalize_and_release() {
    let backend = Arc::new(MockBackend::new());
    backend.queue_maintenance(Ok(maintenance_reply(
        "there's a leak under the kitchen sink",
        "Kitchen sink leak",
        Urgency::Urgent,
        Some(b"%PDF-1.7 fake".to_vec()),
    )));

    let releases = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let devices = Arc::new(ScriptedProvider::new(vec![ScriptedDevice::audio(
        vec![b"leak description".to_vec()],
        Arc::clone(&releases),
    )]));
    let playback = Arc::new(PlaybackManager::new(Arc::new(NullOutput)));

    let surface = MaintenanceSurface::new(backend.clone(), devices, playback);

    // Tap to start, tap to stop.
    assert_eq!(surface.start_capture().await.unwrap(), Gesture::Accepted);
    assert_eq!(
        surface.controller().current_state(),
        TurnState::Recording
    );
    assert_eq!(surface.stop_capture().await.unwrap(), Gesture::Accepted);

    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(backend.upload_count(), 1);

    let result = surface.latest_result().expect("structured result stored");
    assert_eq!(result.request.title, "Kitchen sink leak");
    assert_eq!(result.request.urgency, Urgency::Urgent);
    assert_eq!(result.letter_pdf.as_deref(), Some(b"%PDF-1.7 fake".as_slice()));

    let turns = surface.controller().transcript().snapshot();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "there's a leak under the kitchen sink");
    assert_eq!(
        turns[1].content,
        "Maintenance request created: Kitchen sink leak (urgency: urgent)."
    );

    assert_eq!(surface.controller().current_state(), TurnState::Idle);
}

// ============================================================================
// Transition table
// ============================================================================

#[test]
fn turn_state_transition_table() {
    use TurnState::*;

    assert!(Idle.can_transition(Recording));
    assert!(Recording.can_transition(Uploading));
    assert!(Uploading.can_transition(Processing));
    assert!(Processing.can_transition(Speaking));
    assert!(Processing.can_transition(Idle));
    assert!(Speaking.can_transition(Idle));
    assert!(Error.can_transition(Idle));
    assert!(Uploading.can_transition(Error));

    assert!(!Idle.can_transition(Speaking));
    assert!(!Recording.can_transition(Speaking));
    assert!(!Speaking.can_transition(Recording));
    assert!(!Error.can_transition(Recording));
    assert!(!Uploading.can_transition(Recording));

    assert!(Idle.accepts_capture());
    for state in [Recording, Uploading, Processing, Speaking, Error] {
        assert!(!state.accepts_capture());
    }
}
