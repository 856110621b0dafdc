use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::playback::AudioClip;

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, UploadError> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| UploadError::Protocol(format!("invalid base64 in `{field}`: {e}")))
}

// ============================================================================
// /chat/voice
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct VoiceChatWire {
    pub transcript: String,
    pub answer: String,
    #[serde(default)]
    pub audio: Option<String>,
}

/// Decoded reply from a voice Q&A round trip.
#[derive(Debug, Clone)]
pub struct VoiceChatReply {
    /// What the backend heard the user say.
    pub transcript: String,
    /// The assistant's answer text.
    pub answer: String,
    /// Synthesized answer audio, when the backend produced it.
    pub speech: Option<AudioClip>,
}

impl VoiceChatWire {
    pub(crate) fn into_reply(self) -> Result<VoiceChatReply, UploadError> {
        let speech = match self.audio {
            Some(b64) => Some(AudioClip::mp3(decode_b64("audio", &b64)?)),
            None => None,
        };
        Ok(VoiceChatReply {
            transcript: self.transcript,
            answer: self.answer,
            speech,
        })
    }
}

// ============================================================================
// /maintenance/report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Emergency,
    Urgent,
    Routine,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Routine
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Urgency::Emergency => "emergency",
            Urgency::Urgent => "urgent",
            Urgency::Routine => "routine",
        };
        f.write_str(label)
    }
}

/// Structured maintenance request the backend distilled from the recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub issue_category: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub requested_action: String,
    #[serde(default)]
    pub safety_concern: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MaintenanceWire {
    pub transcript: String,
    pub request: MaintenanceRequest,
    #[serde(default)]
    pub audio_summary: Option<String>,
    #[serde(default)]
    pub pdf: Option<String>,
}

/// Decoded reply from a maintenance report round trip.
#[derive(Debug, Clone)]
pub struct MaintenanceReply {
    pub transcript: String,
    pub request: MaintenanceRequest,
    /// Spoken summary of the created request.
    pub speech: Option<AudioClip>,
    /// Generated request letter, ready to save.
    pub letter_pdf: Option<Vec<u8>>,
}

impl MaintenanceWire {
    pub(crate) fn into_reply(self) -> Result<MaintenanceReply, UploadError> {
        let speech = match self.audio_summary {
            Some(b64) => Some(AudioClip::mp3(decode_b64("audio_summary", &b64)?)),
            None => None,
        };
        let letter_pdf = match self.pdf {
            Some(b64) => Some(decode_b64("pdf", &b64)?),
            None => None,
        };
        Ok(MaintenanceReply {
            transcript: self.transcript,
            request: self.request,
            speech,
            letter_pdf,
        })
    }
}

// ============================================================================
// /deposit/upload
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct DepositWire {
    #[serde(rename = "reportId")]
    pub report_id: String,
}

/// Reply from a walkthrough video upload.
#[derive(Debug, Clone)]
pub struct DepositReply {
    pub report_id: String,
}

/// Context fields accompanying a maintenance recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceDetails {
    #[serde(default = "MaintenanceDetails::default_tenant")]
    pub tenant_name: String,
    #[serde(default = "MaintenanceDetails::default_landlord")]
    pub landlord_name: String,
    #[serde(default)]
    pub property_address: String,
}

impl MaintenanceDetails {
    fn default_tenant() -> String {
        "Tenant".to_string()
    }

    fn default_landlord() -> String {
        "Property Manager".to_string()
    }
}

impl Default for MaintenanceDetails {
    fn default() -> Self {
        Self {
            tenant_name: Self::default_tenant(),
            landlord_name: Self::default_landlord(),
            property_address: String::new(),
        }
    }
}
