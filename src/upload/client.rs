use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::wire::{
    DepositReply, DepositWire, MaintenanceDetails, MaintenanceReply, MaintenanceWire,
    VoiceChatReply, VoiceChatWire,
};
use super::AnalysisBackend;
use crate::capture::CapturePayload;
use crate::config::BackendConfig;
use crate::error::UploadError;

/// HTTP client for the analysis backend.
///
/// One multipart round trip per send, one decoded response per round trip.
/// There is no automatic retry; a retry is a new user-initiated turn.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(UploadError::from)?;

        info!(base_url = %config.base_url, "analysis backend client ready");

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: &str,
        payload: &CapturePayload,
        fields: Vec<(&'static str, String)>,
    ) -> Result<T, UploadError> {
        let part = Part::bytes(payload.bytes().to_vec())
            .file_name(file_name.to_string())
            .mime_str(payload.mime_type())
            .map_err(|e| UploadError::Protocol(format!("payload mime type: {e}")))?;

        let mut form = Form::new().part("file", part);
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, bytes = payload.len(), mime = payload.mime_type(), "uploading payload");

        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| UploadError::Protocol(format!("response body: {e}")))
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for BackendClient {
    async fn voice_chat(
        &self,
        payload: &CapturePayload,
        lease_id: Option<&str>,
    ) -> Result<VoiceChatReply, UploadError> {
        let mut fields = Vec::new();
        if let Some(lease_id) = lease_id {
            fields.push(("lease_id", lease_id.to_string()));
        }

        let wire: VoiceChatWire = self
            .post_multipart(
                "/chat/voice",
                &file_name("voice_query", payload.mime_type()),
                payload,
                fields,
            )
            .await?;
        wire.into_reply()
    }

    async fn maintenance_report(
        &self,
        payload: &CapturePayload,
        details: &MaintenanceDetails,
    ) -> Result<MaintenanceReply, UploadError> {
        let fields = vec![
            ("tenant_name", details.tenant_name.clone()),
            ("landlord_name", details.landlord_name.clone()),
            ("property_address", details.property_address.clone()),
        ];

        let wire: MaintenanceWire = self
            .post_multipart(
                "/maintenance/report",
                &file_name("maintenance_report", payload.mime_type()),
                payload,
                fields,
            )
            .await?;
        wire.into_reply()
    }

    async fn deposit_upload(&self, payload: &CapturePayload) -> Result<DepositReply, UploadError> {
        let wire: DepositWire = self
            .post_multipart(
                "/deposit/upload",
                &file_name("walkthrough", payload.mime_type()),
                payload,
                Vec::new(),
            )
            .await?;
        Ok(DepositReply {
            report_id: wire.report_id,
        })
    }
}

/// Build a filename from the MIME subtype, e.g. `audio/webm` → `stem.webm`.
fn file_name(stem: &str, mime_type: &str) -> String {
    let ext = mime_type
        .split('/')
        .nth(1)
        .map(|subtype| subtype.split(';').next().unwrap_or(subtype))
        .filter(|s| !s.is_empty())
        .unwrap_or("bin");
    format!("{stem}.{ext}")
}
