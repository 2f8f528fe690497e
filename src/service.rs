//! End-to-end sign flow operations.
//!
//! [`EsignService`] sequences the pipeline stages. Each call runs the whole
//! chain on the caller's task, one vendor request at a time; nothing but the
//! immutable configuration and the HTTP client is shared between calls.

use crate::client::{EsignApi, EsignClient};
use crate::config::EsignConfig;
use crate::error::{EsignError, Result};
use crate::pipeline::flow::{self, FlowSummary};
use crate::pipeline::upload;
use crate::pipeline::watch::{self, PollPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Arguments of the `create_sign_flow` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Local path or http(s) URL of the document.
    pub file_path: String,
    /// Display name; its extension selects content type and conversion.
    pub file_name: String,
    /// Signer account (mobile number), also the SMS recipient.
    pub receiver_phone: String,
    /// Signer's legal name; only required when the account is new.
    #[serde(default)]
    pub username: Option<String>,
}

impl SignRequest {
    /// Reject blank required fields.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("filePath", &self.file_path),
            ("fileName", &self.file_name),
            ("receiverPhone", &self.receiver_phone),
        ];
        let blank: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if blank.is_empty() {
            Ok(())
        } else {
            Err(EsignError::InvalidArguments(format!(
                "required fields are empty: {}",
                blank.join(", ")
            )))
        }
    }
}

/// Result of a successful `create_sign_flow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSignFlow {
    pub flow_id: String,
    pub sign_url: String,
}

/// Sign flow operations over an [`EsignApi`].
#[derive(Clone)]
pub struct EsignService {
    api: Arc<dyn EsignApi>,
    config: Arc<EsignConfig>,
}

impl std::fmt::Debug for EsignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsignService")
            .field("api", &"<dyn EsignApi>")
            .field("config", &self.config)
            .finish()
    }
}

impl EsignService {
    /// Service backed by the production HTTP client.
    pub fn new(config: EsignConfig) -> Result<Self> {
        let client = EsignClient::new(&config)?;
        Ok(Self::with_api(Arc::new(client), Arc::new(config)))
    }

    /// Service backed by any [`EsignApi`] implementation.
    pub fn with_api(api: Arc<dyn EsignApi>, config: Arc<EsignConfig>) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &EsignConfig {
        &self.config
    }

    /// Upload → wait for processing → create flow → fetch signing link.
    pub async fn create_sign_flow(&self, request: &SignRequest) -> Result<CreatedSignFlow> {
        request.validate()?;
        let start = Instant::now();
        let api = self.api.as_ref();
        info!(
            "create_sign_flow: file_path={} file_name={}",
            request.file_path, request.file_name
        );

        // ── Step 1: Upload ───────────────────────────────────────────────
        let file_id =
            upload::upload(api, &self.config, &request.file_path, &request.file_name).await?;

        // ── Step 2: Wait for conversion ──────────────────────────────────
        watch::wait_until_ready(api, &file_id, PollPolicy::from(self.config.as_ref())).await?;

        // ── Step 3: Create flow ──────────────────────────────────────────
        let flow_id = flow::create_sign_flow_for(
            api,
            &file_id,
            &request.receiver_phone,
            &request.file_name,
            request.username.as_deref(),
        )
        .await?;

        // ── Step 4: Signing link ─────────────────────────────────────────
        let sign_url = flow::fetch_sign_url(api, &flow_id, &request.receiver_phone).await?;

        info!(
            "Sign flow {} ready in {}ms",
            flow_id,
            start.elapsed().as_millis()
        );
        Ok(CreatedSignFlow { flow_id, sign_url })
    }

    /// Fetch and summarise an existing flow.
    pub async fn query_sign_flow(&self, flow_id: &str) -> Result<FlowSummary> {
        if flow_id.trim().is_empty() {
            return Err(EsignError::InvalidArguments("flowId must not be empty".into()));
        }
        let detail = flow::fetch_flow_detail(self.api.as_ref(), flow_id).await?;
        Ok(FlowSummary::from(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_request_decodes_tool_arguments() {
        let req: SignRequest = serde_json::from_value(json!({
            "filePath": "/tmp/a.pdf",
            "fileName": "a.pdf",
            "receiverPhone": "13800000000"
        }))
        .unwrap();
        assert_eq!(req.username, None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let req = SignRequest {
            file_path: " ".into(),
            file_name: "a.pdf".into(),
            receiver_phone: String::new(),
            username: None,
        };
        let err = req.validate().unwrap_err().to_string();
        assert!(err.contains("filePath"), "{err}");
        assert!(err.contains("receiverPhone"), "{err}");
        assert!(!err.contains("fileName"), "{err}");
    }
}
