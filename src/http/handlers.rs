use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::AppState;
use crate::capture::DeviceSource;
use crate::error::{CaptureError, TurnError};
use crate::turn::{ConversationTurn, Gesture, TurnState};
use crate::upload::{MaintenanceDetails, MaintenanceRequest};
use crate::surface::WalkthroughState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatStateResponse {
    pub state: TurnState,
    pub error: Option<String>,
}

/// One transcript entry as shown to the UI; clip bytes stay server-side and
/// are replayed by index.
#[derive(Debug, Serialize)]
pub struct TurnView {
    pub role: crate::turn::Role,
    pub content: String,
    pub has_audio: bool,
    pub at: chrono::DateTime<chrono::Utc>,
}

impl From<&ConversationTurn> for TurnView {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
            has_audio: turn.has_audio(),
            at: turn.at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetLeaseRequest {
    pub lease_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StopChatResponse {
    pub status: &'static str,
    /// The turns this round trip appended.
    pub turns: Vec<TurnView>,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceResultResponse {
    pub transcript: String,
    pub request: MaintenanceRequest,
    pub has_audio_summary: bool,
    /// Letter PDF, base64-encoded for the UI to save.
    pub pdf: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartWalkthroughRequest {
    /// Pre-recorded file to batch-upload instead of live capture.
    pub file: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalkthroughStateResponse {
    pub state: WalkthroughState,
    pub report_id: Option<String>,
    pub error: Option<String>,
}

fn error_status(err: &TurnError) -> StatusCode {
    match err {
        TurnError::Capture(CaptureError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        TurnError::Capture(CaptureError::Unsupported(_)) => StatusCode::NOT_IMPLEMENTED,
        TurnError::Capture(CaptureError::Recorder(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        TurnError::Upload(_) => StatusCode::BAD_GATEWAY,
        TurnError::Playback(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: TurnError) -> axum::response::Response {
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.user_message().to_string(),
        }),
    )
        .into_response()
}

fn busy_response(state_label: &str) -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: format!("surface is busy ({state_label})"),
        }),
    )
        .into_response()
}

// ============================================================================
// Chat Handlers
// ============================================================================

/// POST /chat/lease
/// Associate (or clear) the lease the chat is about
pub async fn set_chat_lease(
    State(state): State<AppState>,
    Json(req): Json<SetLeaseRequest>,
) -> impl IntoResponse {
    state.chat.set_lease(req.lease_id);
    (StatusCode::OK, Json(StatusResponse { status: "ok" }))
}

/// POST /chat/capture/start
/// Begin recording a question
pub async fn start_chat_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.chat.start_capture().await {
        Ok(Gesture::Accepted) => {
            (StatusCode::OK, Json(StatusResponse { status: "recording" })).into_response()
        }
        Ok(Gesture::Ignored) => busy_response(state.chat.controller().current_state().label()),
        Err(e) => error_response(e),
    }
}

/// POST /chat/capture/stop
/// Stop recording and drive the turn to completion
pub async fn stop_chat_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.chat.stop_capture().await {
        Ok(Gesture::Accepted) => {
            let turns = state.chat.transcript().snapshot();
            let appended: Vec<TurnView> = turns.iter().rev().take(2).rev().map(TurnView::from).collect();
            (
                StatusCode::OK,
                Json(StopChatResponse {
                    status: "completed",
                    turns: appended,
                }),
            )
                .into_response()
        }
        Ok(Gesture::Ignored) => busy_response(state.chat.controller().current_state().label()),
        Err(e) => error_response(e),
    }
}

/// GET /chat/state
pub async fn get_chat_state(State(state): State<AppState>) -> impl IntoResponse {
    let error = state
        .chat
        .controller()
        .last_error()
        .await
        .map(|e| e.user_message().to_string());

    Json(ChatStateResponse {
        state: state.chat.controller().current_state(),
        error,
    })
}

/// GET /chat/transcript
pub async fn get_chat_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let turns: Vec<TurnView> = state
        .chat
        .transcript()
        .snapshot()
        .iter()
        .map(TurnView::from)
        .collect();
    Json(turns)
}

/// POST /chat/turns/:index/replay
pub async fn replay_chat_turn(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    if state.chat.controller().current_state() != TurnState::Idle {
        return busy_response(state.chat.controller().current_state().label());
    }

    match state.chat.replay(index) {
        Ok(true) => (StatusCode::OK, Json(StatusResponse { status: "playing" })).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("turn {index} has no stored audio"),
            }),
        )
            .into_response(),
        Err(e) => error_response(TurnError::from(e)),
    }
}

/// POST /chat/error/ack
pub async fn ack_chat_error(State(state): State<AppState>) -> impl IntoResponse {
    state.chat.acknowledge_error().await;
    Json(ChatStateResponse {
        state: state.chat.controller().current_state(),
        error: None,
    })
}

// ============================================================================
// Maintenance Handlers
// ============================================================================

/// POST /maintenance/details
pub async fn set_maintenance_details(
    State(state): State<AppState>,
    Json(details): Json<MaintenanceDetails>,
) -> impl IntoResponse {
    state.maintenance.set_details(details);
    (StatusCode::OK, Json(StatusResponse { status: "ok" }))
}

/// POST /maintenance/capture/start
pub async fn start_maintenance_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.maintenance.start_capture().await {
        Ok(Gesture::Accepted) => {
            (StatusCode::OK, Json(StatusResponse { status: "recording" })).into_response()
        }
        Ok(Gesture::Ignored) => {
            busy_response(state.maintenance.controller().current_state().label())
        }
        Err(e) => error_response(e),
    }
}

/// POST /maintenance/capture/stop
pub async fn stop_maintenance_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.maintenance.stop_capture().await {
        Ok(Gesture::Accepted) => {
            (StatusCode::OK, Json(StatusResponse { status: "completed" })).into_response()
        }
        Ok(Gesture::Ignored) => {
            busy_response(state.maintenance.controller().current_state().label())
        }
        Err(e) => error_response(e),
    }
}

/// GET /maintenance/state
pub async fn get_maintenance_state(State(state): State<AppState>) -> impl IntoResponse {
    let error = state
        .maintenance
        .controller()
        .last_error()
        .await
        .map(|e| e.user_message().to_string());

    Json(ChatStateResponse {
        state: state.maintenance.controller().current_state(),
        error,
    })
}

/// GET /maintenance/result
pub async fn get_maintenance_result(State(state): State<AppState>) -> impl IntoResponse {
    match state.maintenance.latest_result() {
        Some(reply) => {
            let pdf = reply
                .letter_pdf
                .as_ref()
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));
            (
                StatusCode::OK,
                Json(MaintenanceResultResponse {
                    transcript: reply.transcript,
                    request: reply.request,
                    has_audio_summary: reply.speech.is_some(),
                    pdf,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no maintenance report yet".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /maintenance/error/ack
pub async fn ack_maintenance_error(State(state): State<AppState>) -> impl IntoResponse {
    state.maintenance.acknowledge_error().await;
    Json(ChatStateResponse {
        state: state.maintenance.controller().current_state(),
        error: None,
    })
}

// ============================================================================
// Walkthrough Handlers
// ============================================================================

/// POST /walkthrough/capture/start
pub async fn start_walkthrough_capture(
    State(state): State<AppState>,
    Json(req): Json<StartWalkthroughRequest>,
) -> impl IntoResponse {
    let source = req.file.map(|file| DeviceSource::File {
        path: PathBuf::from(file),
        mime_type: req.mime_type.unwrap_or_else(|| "video/mp4".to_string()),
    });

    match state.walkthrough.start_capture(source).await {
        Ok(Gesture::Accepted) => {
            (StatusCode::OK, Json(StatusResponse { status: "recording" })).into_response()
        }
        Ok(Gesture::Ignored) => busy_response(state.walkthrough.current_state().label()),
        Err(e) => error_response(e),
    }
}

/// POST /walkthrough/capture/stop
pub async fn stop_walkthrough_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.walkthrough.stop_capture().await {
        Ok(Gesture::Accepted) => {
            let report_id = state.walkthrough.report_id().await;
            info!(?report_id, "walkthrough upload finished");
            (
                StatusCode::OK,
                Json(WalkthroughStateResponse {
                    state: state.walkthrough.current_state(),
                    report_id,
                    error: None,
                }),
            )
                .into_response()
        }
        Ok(Gesture::Ignored) => busy_response(state.walkthrough.current_state().label()),
        Err(e) => error_response(e),
    }
}

/// GET /walkthrough/state
pub async fn get_walkthrough_state(State(state): State<AppState>) -> impl IntoResponse {
    let error = state
        .walkthrough
        .last_error()
        .await
        .map(|e| e.user_message().to_string());

    Json(WalkthroughStateResponse {
        state: state.walkthrough.current_state(),
        report_id: state.walkthrough.report_id().await,
        error,
    })
}

/// POST /walkthrough/reset
pub async fn reset_walkthrough(State(state): State<AppState>) -> impl IntoResponse {
    state.walkthrough.reset().await;
    (StatusCode::OK, Json(StatusResponse { status: "idle" }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
