//! Sign flow stage: create the flow, fetch the signing link, read details.
//!
//! Flow policy is fixed: one document, one personal signer, SMS
//! notification, seven-day expiry, a forced ten-second reading time and a
//! single visible signature field with the signing date beneath it.

use crate::client::EsignApi;
use crate::error::{EsignError, Result};
use crate::model::{
    CreateFlowRequest, FlowDoc, FlowSigner, NormalSignFieldConfig, NoticeConfig, PsnInfo,
    PsnSignerInfo, SignDateConfig, SignField, SignFieldPosition, SignFlowConfig,
    SignFlowDetail, SignUrlOperator, SignUrlRequest, SignerKind, SignerSignConfig,
};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::info;

const FLOW_TITLE: &str = "待签署文件";
const FLOW_DESC: &str = "请签署文件";
const FLOW_LIFETIME_MS: i64 = 7 * 24 * 60 * 60 * 1000;
/// Notification channel code for SMS.
const NOTIFY_SMS: &str = "1";
const FORCED_READING_SECS: &str = "10";

/// Build the `create-by-file` body for a single signer.
///
/// `now_ms` is the flow's effective time; it expires seven days later.
/// A missing or blank `username` omits `psnInfo` entirely so the vendor
/// uses the name already registered for `receiver_phone`.
pub fn build_create_flow_request(
    file_id: &str,
    receiver_phone: &str,
    file_name: &str,
    username: Option<&str>,
    now_ms: i64,
) -> CreateFlowRequest {
    let psn_info = username
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| PsnInfo {
            psn_name: Some(name.to_string()),
        });

    CreateFlowRequest {
        docs: vec![FlowDoc {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
        }],
        sign_flow_config: SignFlowConfig {
            sign_flow_title: FLOW_TITLE.to_string(),
            sign_flow_desc: FLOW_DESC.to_string(),
            sign_flow_effective_time: now_ms,
            sign_flow_expire_time: now_ms + FLOW_LIFETIME_MS,
            sign_order: false,
            notify_type: NOTIFY_SMS.to_string(),
            redirect_url: String::new(),
            auto_finish: true,
        },
        signers: vec![FlowSigner {
            sign_config: SignerSignConfig {
                sign_order: 1,
                forced_reading_time: FORCED_READING_SECS.to_string(),
            },
            notice_config: NoticeConfig {
                notice_types: NOTIFY_SMS.to_string(),
            },
            signer_type: 0,
            psn_signer_info: PsnSignerInfo {
                psn_account: receiver_phone.to_string(),
                psn_info,
            },
            sign_fields: vec![SignField {
                file_id: file_id.to_string(),
                sign_field_type: 0,
                normal_sign_field_config: NormalSignFieldConfig {
                    auto_sign: false,
                    free_mode: false,
                    movable_sign_field: false,
                    sign_field_style: 1,
                    sign_field_size: "96".to_string(),
                    sign_field_position: SignFieldPosition {
                        position_page: "1".to_string(),
                        position_x: 100,
                        position_y: 100,
                    },
                },
                sign_date_config: SignDateConfig {
                    date_format: "yyyy-MM-dd".to_string(),
                    show_sign_date: 1,
                    sign_date_position_x: 100,
                    sign_date_position_y: 150,
                },
            }],
        }],
        auto_start: true,
    }
}

/// Create and start a flow for an uploaded, processed file.
pub async fn create_sign_flow_for(
    api: &dyn EsignApi,
    file_id: &str,
    receiver_phone: &str,
    file_name: &str,
    username: Option<&str>,
) -> Result<String> {
    let now_ms = Utc::now().timestamp_millis();
    let request = build_create_flow_request(file_id, receiver_phone, file_name, username, now_ms);
    let created = api
        .create_flow(&request)
        .await?
        .or_fail(|message| EsignError::FlowCreationFailed { message })?;
    info!("Created sign flow {} for file {}", created.sign_flow_id, file_id);
    Ok(created.sign_flow_id)
}

/// Request a no-login signing link for `receiver_phone`.
pub async fn fetch_sign_url(
    api: &dyn EsignApi,
    flow_id: &str,
    receiver_phone: &str,
) -> Result<String> {
    let request = SignUrlRequest {
        need_login: false,
        url_type: 2,
        operator: SignUrlOperator {
            psn_account: receiver_phone.to_string(),
        },
        client_type: "ALL".to_string(),
    };
    let urls = api
        .sign_url(flow_id, &request)
        .await?
        .or_fail(|message| EsignError::SignUrlFailed { message })?;
    urls.preferred()
        .map(str::to_string)
        .ok_or_else(|| EsignError::SignUrlFailed {
            message: "response contained neither shortUrl nor url".into(),
        })
}

/// Read the current state of a flow.
pub async fn fetch_flow_detail(api: &dyn EsignApi, flow_id: &str) -> Result<SignFlowDetail> {
    api.flow_detail(flow_id)
        .await?
        .or_fail(|message| EsignError::FlowDetailFailed { message })
}

// ── Summary ──────────────────────────────────────────────────────────────

/// User-facing rendering of a [`SignFlowDetail`].
#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub detail: SignFlowDetail,
}

impl From<SignFlowDetail> for FlowSummary {
    fn from(detail: SignFlowDetail) -> Self {
        Self { detail }
    }
}

/// Epoch milliseconds as UTC, or "not completed" for null/zero.
pub fn format_timestamp(ms: Option<i64>) -> String {
    match ms.filter(|&ms| ms != 0).and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "not completed".to_string(),
    }
}

fn format_signer(kind: SignerKind) -> String {
    match kind {
        SignerKind::Personal { name, mobile, .. } => {
            format!("{} ({})", name, mobile.unwrap_or_default())
        }
        SignerKind::Enterprise => "enterprise signer".to_string(),
    }
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.detail;
        let docs: Vec<&str> = d.docs.iter().map(|doc| doc.file_name.as_str()).collect();
        let signers: Vec<String> = d.signers.iter().map(|s| format_signer(s.kind())).collect();

        writeln!(f, "Sign flow details:")?;
        writeln!(
            f,
            "Status: {} ({})",
            d.status().label(),
            d.sign_flow_description.as_deref().unwrap_or_default()
        )?;
        writeln!(f, "Created: {}", format_timestamp(d.sign_flow_create_time))?;
        writeln!(f, "Started: {}", format_timestamp(d.sign_flow_start_time))?;
        writeln!(f, "Finished: {}", format_timestamp(d.sign_flow_finish_time))?;
        writeln!(f, "Documents: {}", docs.join(", "))?;
        write!(f, "Signers: {}", signers.join(", "))
    }
}
