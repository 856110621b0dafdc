use serde::{Deserialize, Serialize};

/// What a payload carries: bare audio, or muxed audio+video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// The finalized, immutable product of one capture session.
///
/// Created once when a session stops; ownership passes to the upload
/// pipeline and the bytes are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePayload {
    bytes: Vec<u8>,
    mime_type: String,
    kind: MediaKind,
}

impl CapturePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            kind,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A stopped session with zero captured chunks still finalizes into an
    /// empty payload; callers decide whether to upload it.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
