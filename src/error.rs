use thiserror::Error;

/// Errors raised while acquiring or driving a capture device.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The user declined the permission prompt, or no usable hardware exists.
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// The requested source has no backend on this platform.
    #[error("capture source unsupported: {0}")]
    Unsupported(String),

    /// The recorder failed mid-flight (stream build, container encoding).
    #[error("recorder failure: {0}")]
    Recorder(String),
}

/// Errors raised by the upload pipeline.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// Transport-level failure (DNS, connect, timeout, aborted body).
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The response body could not be interpreted (malformed JSON, bad base64).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Network(err.to_string())
    }
}

/// Errors raised while decoding or playing an audio clip.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// Umbrella error carried on a failed turn; every variant is recoverable
/// from the user's point of view.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl TurnError {
    /// The actionable message a surface shows inline for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::Capture(CaptureError::PermissionDenied(_)) => {
                "Microphone access is required. Please allow permissions."
            }
            TurnError::Capture(CaptureError::Unsupported(_)) => {
                "Could not access camera/microphone on this device."
            }
            TurnError::Capture(CaptureError::Recorder(_)) => {
                "Recording failed. Please try again."
            }
            TurnError::Upload(_) => "Sorry, I couldn't process that. Please try again.",
            TurnError::Playback(_) => "Audio playback is unavailable.",
        }
    }
}
