//! Error types for the esign-mcp library.
//!
//! Every failure in the sign-flow chain is an [`EsignError`]. The library
//! propagates them with `?`; the tool boundary ([`crate::tools::ToolRouter`])
//! is the only place they are turned into user-visible text, so a failing
//! vendor call never becomes a protocol fault.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the esign-mcp library.
#[derive(Debug, Error)]
pub enum EsignError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// One or more of `HOST`, `APP_ID`, `APP_SECRET` is unset or empty.
    #[error("Missing required configuration: {}", missing.join(", "))]
    ConfigurationMissing { missing: Vec<&'static str> },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The file name's extension is not one the vendor can convert.
    #[error("Unsupported file format '{file_name}'. Supported formats: {supported}")]
    UnsupportedFileFormat { file_name: String, supported: String },

    /// A tool was invoked with missing or malformed arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Remote file could not be fetched into the scratch area.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Local file could not be read or the scratch file could not be written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Vendor errors ─────────────────────────────────────────────────────
    /// `/v3/files/file-upload-url` answered with a non-zero code.
    #[error("Failed to get upload URL: {message}")]
    UploadUrlRequestFailed { message: String },

    /// The raw PUT to the pre-signed upload URL was not 2xx.
    #[error("Failed to upload file: HTTP {status}")]
    FileUploadFailed { status: u16 },

    /// File status query answered with a non-zero code.
    #[error("Failed to query file status: {message}")]
    FileStatusQueryFailed { message: String },

    /// Vendor-side upload or conversion ended in a failure state.
    #[error("File processing failed: status {status}")]
    FileProcessingFailed { status: i64 },

    /// The file never reached a usable state within the poll budget.
    #[error("File processing timed out after {attempts} status checks, please retry later")]
    FileProcessingTimeout { attempts: u32 },

    /// `/v3/sign-flow/create-by-file` answered with a non-zero code.
    #[error("Sign flow creation failed: {message}")]
    FlowCreationFailed { message: String },

    /// `/v3/sign-flow/{id}/sign-url` answered with a non-zero code.
    #[error("Failed to get sign URL: {message}")]
    SignUrlFailed { message: String },

    /// `/v3/sign-flow/{id}/detail` answered with a non-zero code.
    #[error("Failed to get sign flow detail: {message}")]
    FlowDetailFailed { message: String },

    // ── Transport ─────────────────────────────────────────────────────────
    /// Network failure or undecodable response body.
    #[error("Request to '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// A request body could not be encoded.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope reported success but carried no `data`.
    #[error("Malformed response from '{endpoint}': {detail}")]
    MalformedResponse { endpoint: String, detail: String },
}

impl EsignError {
    pub(crate) fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        EsignError::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EsignError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = EsignError> = std::result::Result<T, E>;
