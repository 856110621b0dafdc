//! Upload pipeline: multipart transport to the analysis backend
//!
//! Every operation ships a finalized `CapturePayload` plus context metadata
//! and decodes the structured JSON reply. Failures are typed: transport and
//! non-success statuses surface as `UploadError::Network`/`Status`, and any
//! undecodable body surfaces as `UploadError::Protocol`: never silently
//! swallowed.

pub mod client;
pub mod wire;

pub use client::BackendClient;
pub use wire::{
    DepositReply, MaintenanceDetails, MaintenanceReply, MaintenanceRequest, Urgency,
    VoiceChatReply,
};

use crate::capture::CapturePayload;
use crate::error::UploadError;

/// The analysis backend's contract, as consumed by the surfaces.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// `POST /chat/voice`: voice Q&A.
    async fn voice_chat(
        &self,
        payload: &CapturePayload,
        lease_id: Option<&str>,
    ) -> Result<VoiceChatReply, UploadError>;

    /// `POST /maintenance/report`: voice maintenance documentation.
    async fn maintenance_report(
        &self,
        payload: &CapturePayload,
        details: &MaintenanceDetails,
    ) -> Result<MaintenanceReply, UploadError>;

    /// `POST /deposit/upload`: walkthrough video analysis.
    async fn deposit_upload(&self, payload: &CapturePayload) -> Result<DepositReply, UploadError>;
}
