//! HTTP control API exposed to the UI collaborator
//!
//! This is the whole boundary the surrounding UI sees: capture state and
//! transcript/result observables (polled or fetched here, watched in-process
//! by embedders), and the imperative start/stop entry points:
//! - POST /chat/capture/start|stop, GET /chat/state, GET /chat/transcript
//! - POST /maintenance/capture/start|stop, GET /maintenance/result
//! - POST /walkthrough/capture/start|stop, GET /walkthrough/state
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
