//! Wire types for the e-sign Open API v3.
//!
//! Field names follow the vendor's JSON verbatim (camelCase, with the odd
//! `convertToPDF` / `convertToHTML` spelling). Optional request fields use
//! `skip_serializing_if` so they are omitted rather than sent as `null`;
//! the vendor treats an explicit `null` differently from an absent key for
//! `psnInfo`.

use crate::error::EsignError;
use serde::{Deserialize, Serialize};

// ── Envelope ─────────────────────────────────────────────────────────────

/// Raw `{code, message, data}` envelope every endpoint answers with.
///
/// `data` is kept as untyped JSON until the code is known: failure
/// responses often carry a `data` shape unrelated to the success type.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A decoded vendor response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    /// `code == 0`.
    Success(T),
    /// Application-level rejection with the vendor's message.
    Failure { code: i64, message: String },
}

impl<T> ApiOutcome<T> {
    /// Map a failure into the caller's error variant.
    pub fn or_fail(self, to_error: impl FnOnce(String) -> EsignError) -> Result<T, EsignError> {
        match self {
            ApiOutcome::Success(data) => Ok(data),
            ApiOutcome::Failure { code, message } => {
                tracing::warn!("Vendor rejected request: {} {}", code, message);
                Err(to_error(message))
            }
        }
    }
}

impl Envelope {
    /// Decode `data` into `T` when `code == 0`.
    pub fn into_outcome<T>(self, endpoint: &str) -> Result<ApiOutcome<T>, EsignError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if self.code != 0 {
            return Ok(ApiOutcome::Failure {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| format!("error code {}", self.code)),
            });
        }
        let data = self.data.ok_or_else(|| EsignError::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: "success envelope without data".into(),
        })?;
        serde_json::from_value(data)
            .map(ApiOutcome::Success)
            .map_err(|e| EsignError::MalformedResponse {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })
    }
}

// ── Files ────────────────────────────────────────────────────────────────

/// Body of `POST /v3/files/file-upload-url`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlotRequest {
    pub content_md5: String,
    pub content_type: String,
    pub file_name: String,
    pub file_size: u64,
    #[serde(rename = "convertToPDF")]
    pub convert_to_pdf: bool,
    #[serde(rename = "convertToHTML", skip_serializing_if = "Option::is_none")]
    pub convert_to_html: Option<bool>,
}

/// Upload slot granted by the vendor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub file_id: String,
    /// Pre-signed, time-limited PUT target.
    pub file_upload_url: String,
}

/// Vendor-side processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FileStatus {
    NotUploaded,
    Uploading,
    /// Upload finished, or HTML conversion finished.
    UploadComplete,
    UploadFailed,
    WaitingConvert,
    /// PDF conversion finished.
    ConvertComplete,
    Watermarking,
    WatermarkComplete,
    Converting,
    ConvertFailed,
    WaitingHtml,
    ConvertingHtml,
    ConvertHtmlFailed,
    Unknown(i64),
}

/// What the watcher should do with a [`FileStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Keep polling.
    Transient,
    /// Usable for flow creation.
    Ready,
    /// Terminal failure.
    Failed,
}

impl FileStatus {
    pub fn code(self) -> i64 {
        match self {
            FileStatus::NotUploaded => 0,
            FileStatus::Uploading => 1,
            FileStatus::UploadComplete => 2,
            FileStatus::UploadFailed => 3,
            FileStatus::WaitingConvert => 4,
            FileStatus::ConvertComplete => 5,
            FileStatus::Watermarking => 6,
            FileStatus::WatermarkComplete => 7,
            FileStatus::Converting => 8,
            FileStatus::ConvertFailed => 9,
            FileStatus::WaitingHtml => 10,
            FileStatus::ConvertingHtml => 11,
            FileStatus::ConvertHtmlFailed => 12,
            FileStatus::Unknown(code) => code,
        }
    }

    pub fn classify(self) -> Readiness {
        match self {
            FileStatus::UploadComplete | FileStatus::ConvertComplete => Readiness::Ready,
            FileStatus::UploadFailed | FileStatus::ConvertFailed | FileStatus::ConvertHtmlFailed => {
                Readiness::Failed
            }
            FileStatus::NotUploaded
            | FileStatus::Uploading
            | FileStatus::WaitingConvert
            | FileStatus::Watermarking
            | FileStatus::WatermarkComplete
            | FileStatus::Converting
            | FileStatus::WaitingHtml
            | FileStatus::ConvertingHtml
            | FileStatus::Unknown(_) => Readiness::Transient,
        }
    }
}

impl From<i64> for FileStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => FileStatus::NotUploaded,
            1 => FileStatus::Uploading,
            2 => FileStatus::UploadComplete,
            3 => FileStatus::UploadFailed,
            4 => FileStatus::WaitingConvert,
            5 => FileStatus::ConvertComplete,
            6 => FileStatus::Watermarking,
            7 => FileStatus::WatermarkComplete,
            8 => FileStatus::Converting,
            9 => FileStatus::ConvertFailed,
            10 => FileStatus::WaitingHtml,
            11 => FileStatus::ConvertingHtml,
            12 => FileStatus::ConvertHtmlFailed,
            other => FileStatus::Unknown(other),
        }
    }
}

impl From<FileStatus> for i64 {
    fn from(status: FileStatus) -> Self {
        status.code()
    }
}

/// Response of `GET /v3/files/{fileId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusRecord {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    pub file_status: FileStatus,
    #[serde(default)]
    pub file_download_url: Option<String>,
    #[serde(default)]
    pub file_total_page_count: Option<u32>,
}

// ── Sign flow creation ───────────────────────────────────────────────────

/// Body of `POST /v3/sign-flow/create-by-file`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlowRequest {
    pub docs: Vec<FlowDoc>,
    pub sign_flow_config: SignFlowConfig,
    pub signers: Vec<FlowSigner>,
    pub auto_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDoc {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignFlowConfig {
    pub sign_flow_title: String,
    pub sign_flow_desc: String,
    /// Epoch milliseconds.
    pub sign_flow_effective_time: i64,
    /// Epoch milliseconds.
    pub sign_flow_expire_time: i64,
    /// `false` lets signers sign in any order.
    pub sign_order: bool,
    /// `"1"` is SMS.
    pub notify_type: String,
    pub redirect_url: String,
    pub auto_finish: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSigner {
    pub sign_config: SignerSignConfig,
    pub notice_config: NoticeConfig,
    /// `0` personal, `1` enterprise.
    pub signer_type: i32,
    pub psn_signer_info: PsnSignerInfo,
    pub sign_fields: Vec<SignField>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerSignConfig {
    pub sign_order: u32,
    /// Seconds, as a string.
    pub forced_reading_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeConfig {
    pub notice_types: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsnSignerInfo {
    /// Mobile number or email the signer logs in with.
    pub psn_account: String,
    /// Absent means "use the account's registered identity".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psn_info: Option<PsnInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsnInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psn_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignField {
    pub file_id: String,
    pub sign_field_type: i32,
    pub normal_sign_field_config: NormalSignFieldConfig,
    pub sign_date_config: SignDateConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalSignFieldConfig {
    pub auto_sign: bool,
    pub free_mode: bool,
    pub movable_sign_field: bool,
    pub sign_field_style: i32,
    pub sign_field_size: String,
    pub sign_field_position: SignFieldPosition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignFieldPosition {
    pub position_page: String,
    pub position_x: u32,
    pub position_y: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDateConfig {
    pub date_format: String,
    pub show_sign_date: i32,
    pub sign_date_position_x: u32,
    pub sign_date_position_y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFlow {
    pub sign_flow_id: String,
}

// ── Sign URL ─────────────────────────────────────────────────────────────

/// Body of `POST /v3/sign-flow/{signFlowId}/sign-url`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUrlRequest {
    pub need_login: bool,
    /// `2` is a signing link (as opposed to a preview link).
    pub url_type: i32,
    pub operator: SignUrlOperator,
    /// `"ALL"` adapts to mobile or desktop automatically.
    pub client_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUrlOperator {
    pub psn_account: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUrl {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub short_url: Option<String>,
}

impl SignUrl {
    /// The short link when present, otherwise the long one.
    pub fn preferred(&self) -> Option<&str> {
        self.short_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.url.as_deref().filter(|s| !s.is_empty()))
    }
}

// ── Sign flow detail ─────────────────────────────────────────────────────

/// Response of `GET /v3/sign-flow/{signFlowId}/detail`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignFlowDetail {
    pub sign_flow_status: i64,
    #[serde(default)]
    pub sign_flow_description: Option<String>,
    #[serde(default)]
    pub sign_flow_create_time: Option<i64>,
    #[serde(default)]
    pub sign_flow_start_time: Option<i64>,
    #[serde(default)]
    pub sign_flow_finish_time: Option<i64>,
    #[serde(default)]
    pub docs: Vec<FlowDoc>,
    #[serde(default)]
    pub signers: Vec<FlowSignerDetail>,
}

impl SignFlowDetail {
    pub fn status(&self) -> FlowStatus {
        FlowStatus::from(self.sign_flow_status)
    }
}

/// Lifecycle of a sign flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Draft,
    InProgress,
    Completed,
    Revoked,
    Expired,
    Rejected,
    Unknown(i64),
}

impl From<i64> for FlowStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => FlowStatus::Draft,
            1 => FlowStatus::InProgress,
            2 => FlowStatus::Completed,
            3 => FlowStatus::Revoked,
            5 => FlowStatus::Expired,
            7 => FlowStatus::Rejected,
            other => FlowStatus::Unknown(other),
        }
    }
}

impl FlowStatus {
    pub fn label(self) -> &'static str {
        match self {
            FlowStatus::Draft => "draft",
            FlowStatus::InProgress => "in-progress",
            FlowStatus::Completed => "completed",
            FlowStatus::Revoked => "revoked",
            FlowStatus::Expired => "expired",
            FlowStatus::Rejected => "rejected",
            FlowStatus::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSignerDetail {
    #[serde(default)]
    pub psn_signer: Option<PsnSignerDetail>,
    #[serde(default)]
    pub signer_type: Option<i32>,
    #[serde(default)]
    pub sign_order: Option<i32>,
    #[serde(default)]
    pub sign_status: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsnSignerDetail {
    #[serde(default)]
    pub psn_name: Option<String>,
    #[serde(default)]
    pub psn_account: Option<PsnAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsnAccount {
    #[serde(default)]
    pub account_mobile: Option<String>,
    #[serde(default)]
    pub account_email: Option<String>,
}

/// A flow participant, personal or enterprise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerKind {
    Personal {
        name: String,
        mobile: Option<String>,
        email: Option<String>,
    },
    Enterprise,
}

impl FlowSignerDetail {
    pub fn kind(&self) -> SignerKind {
        match &self.psn_signer {
            Some(psn) => {
                let account = psn.psn_account.as_ref();
                SignerKind::Personal {
                    name: psn.psn_name.clone().unwrap_or_default(),
                    mobile: account.and_then(|a| a.account_mobile.clone()),
                    email: account.and_then(|a| a.account_email.clone()),
                }
            }
            None => SignerKind::Enterprise,
        }
    }
}
