pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod playback;
pub mod surface;
pub mod turn;
pub mod upload;

pub use capture::{
    CaptureConfig, CaptureDevice, CaptureDeviceFactory, CapturePayload, CaptureSession,
    DeviceConstraints, DeviceProvider, DeviceSource, FileDevice, LiveStream, MediaChunk,
    MediaKind, MicrophoneDevice, SessionState, SourceProvider,
};
pub use config::Config;
pub use error::{CaptureError, PlaybackError, TurnError, UploadError};
pub use http::{create_router, AppState};
pub use playback::{
    AudioClip, AudioOutput, NullOutput, PlaybackControl, PlaybackDone, PlaybackManager,
    PlaybackOutcome, RodioOutput,
};
pub use surface::{MaintenanceSurface, VoiceChatSurface, WalkthroughState, WalkthroughSurface};
pub use turn::{
    ConversationTurn, Gesture, Role, Transcript, TurnEvent, TurnFlow, TurnReply, TurnState,
    TurnTakingController,
};
pub use upload::{
    AnalysisBackend, BackendClient, DepositReply, MaintenanceDetails, MaintenanceReply,
    MaintenanceRequest, Urgency, VoiceChatReply,
};
