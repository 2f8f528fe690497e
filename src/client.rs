//! Signed HTTP transport for the e-sign Open API.
//!
//! [`EsignApi`] is the seam the pipeline stages are written against;
//! [`EsignClient`] is the production implementation over `reqwest`. Each
//! operation is exactly one HTTP exchange. Vendor rejections come back as
//! [`ApiOutcome::Failure`] so callers can attach their own error variant;
//! only transport problems (network, undecodable body) are `Err` here.

use crate::config::EsignConfig;
use crate::error::{EsignError, Result};
use crate::model::{
    ApiOutcome, CreateFlowRequest, CreatedFlow, Envelope, FileStatusRecord, SignFlowDetail,
    SignUrl, SignUrlRequest, UploadSlot, UploadSlotRequest,
};
use crate::signer::{content_md5, RequestSigner, ACCEPT};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

/// Content type of every JSON request body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

pub const HEADER_APP_ID: &str = "X-Tsign-Open-App-Id";
pub const HEADER_AUTH_MODE: &str = "X-Tsign-Open-Auth-Mode";
pub const HEADER_TIMESTAMP: &str = "X-Tsign-Open-Ca-Timestamp";
pub const HEADER_SIGNATURE: &str = "X-Tsign-Open-Ca-Signature";
pub const AUTH_MODE_SIGNATURE: &str = "Signature";

pub const PATH_UPLOAD_URL: &str = "/v3/files/file-upload-url";
pub const PATH_CREATE_BY_FILE: &str = "/v3/sign-flow/create-by-file";

/// Check that a vendor id can be placed in a URL path as one segment.
///
/// Ids are ASCII letters, digits, `-` and `_`. Anything else (`/`, `?`, `#`,
/// `%`, dots, whitespace) would change which resource is signed and
/// requested, so it is rejected before the request is built.
pub fn path_segment<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(EsignError::InvalidArguments(format!(
            "{kind} {id:?} contains characters not allowed in an id"
        )))
    }
}

/// Operations the sign-flow pipeline needs from the vendor.
#[async_trait]
pub trait EsignApi: Send + Sync {
    /// `POST /v3/files/file-upload-url`
    async fn request_upload_slot(
        &self,
        request: &UploadSlotRequest,
    ) -> Result<ApiOutcome<UploadSlot>>;

    /// Unsigned `PUT` of the raw bytes to a pre-signed upload URL.
    ///
    /// Non-2xx answers are [`EsignError::FileUploadFailed`].
    async fn put_file(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
        content_md5: &str,
    ) -> Result<()>;

    /// `POST /v3/sign-flow/create-by-file`
    async fn create_flow(&self, request: &CreateFlowRequest) -> Result<ApiOutcome<CreatedFlow>>;

    /// `POST /v3/sign-flow/{flowId}/sign-url`
    async fn sign_url(&self, flow_id: &str, request: &SignUrlRequest)
        -> Result<ApiOutcome<SignUrl>>;

    /// `GET /v3/sign-flow/{flowId}/detail`
    async fn flow_detail(&self, flow_id: &str) -> Result<ApiOutcome<SignFlowDetail>>;

    /// `GET /v3/files/{fileId}`
    async fn file_status(&self, file_id: &str) -> Result<ApiOutcome<FileStatusRecord>>;
}

/// `reqwest`-backed [`EsignApi`].
#[derive(Debug, Clone)]
pub struct EsignClient {
    http: reqwest::Client,
    host: String,
    app_id: String,
    user_agent: String,
    signer: RequestSigner,
}

impl EsignClient {
    /// Build a client for the configured host.
    ///
    /// No request timeout is set: uploads of large scans can legitimately
    /// take minutes.
    pub fn new(config: &EsignConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| EsignError::transport(config.host.as_str(), e))?;
        Ok(Self::with_http(http, config))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, config: &EsignConfig) -> Self {
        Self {
            http,
            host: config.host.clone(),
            app_id: config.app_id.clone(),
            user_agent: config.user_agent.clone(),
            signer: RequestSigner::new(&config.app_secret),
        }
    }

    /// Attach the vendor authentication headers.
    ///
    /// `Content-Type` and `Content-MD5` are only sent with a body; without
    /// one both slots of the canonical string are empty so the signature
    /// matches what the vendor sees.
    fn signed(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> RequestBuilder {
        let (md5, content_type) = match body {
            Some(bytes) => (content_md5(bytes), JSON_CONTENT_TYPE),
            None => (String::new(), ""),
        };
        let signature = self.signer.sign(method.as_str(), path, &md5, content_type);
        let timestamp = chrono::Utc::now().timestamp_millis();

        let mut builder = builder
            .header(HEADER_APP_ID, &self.app_id)
            .header(HEADER_AUTH_MODE, AUTH_MODE_SIGNATURE)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(HEADER_TIMESTAMP, timestamp.to_string());
        if body.is_some() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header("Content-MD5", md5);
        }
        builder.header(HEADER_SIGNATURE, signature)
    }

    async fn call<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiOutcome<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.host, path);
        debug!("Vendor request: {} {}", method, url);

        let builder = self.http.request(method.clone(), &url);
        let mut builder = self.signed(builder, &method, path, body.as_deref());
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EsignError::transport(path, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EsignError::transport(path, e))?;
        debug!("Vendor response from {}: {} {}", path, status, text);

        let envelope: Envelope =
            serde_json::from_str(&text).map_err(|e| EsignError::MalformedResponse {
                endpoint: path.to_string(),
                detail: format!("HTTP {status}: {e}"),
            })?;
        envelope.into_outcome(path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ApiOutcome<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body)?;
        self.call(Method::POST, path, Some(bytes)).await
    }
}

#[async_trait]
impl EsignApi for EsignClient {
    async fn request_upload_slot(
        &self,
        request: &UploadSlotRequest,
    ) -> Result<ApiOutcome<UploadSlot>> {
        info!(
            "Requesting upload slot for {} ({} bytes)",
            request.file_name, request.file_size
        );
        self.post_json(PATH_UPLOAD_URL, request).await
    }

    async fn put_file(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
        content_md5: &str,
    ) -> Result<()> {
        let size = bytes.len();
        let response = self
            .http
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("Content-MD5", content_md5)
            .body(bytes)
            .send()
            .await
            .map_err(|e| EsignError::transport("file upload", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EsignError::FileUploadFailed {
                status: status.as_u16(),
            });
        }
        info!("Uploaded {} bytes", size);
        Ok(())
    }

    async fn create_flow(&self, request: &CreateFlowRequest) -> Result<ApiOutcome<CreatedFlow>> {
        self.post_json(PATH_CREATE_BY_FILE, request).await
    }

    async fn sign_url(
        &self,
        flow_id: &str,
        request: &SignUrlRequest,
    ) -> Result<ApiOutcome<SignUrl>> {
        let path = format!("/v3/sign-flow/{}/sign-url", path_segment("flowId", flow_id)?);
        self.post_json(&path, request).await
    }

    async fn flow_detail(&self, flow_id: &str) -> Result<ApiOutcome<SignFlowDetail>> {
        let path = format!("/v3/sign-flow/{}/detail", path_segment("flowId", flow_id)?);
        self.call(Method::GET, &path, None).await
    }

    async fn file_status(&self, file_id: &str) -> Result<ApiOutcome<FileStatusRecord>> {
        let path = format!("/v3/files/{}", path_segment("fileId", file_id)?);
        self.call(Method::GET, &path, None).await
    }
}
