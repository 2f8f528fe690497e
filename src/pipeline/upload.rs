//! Upload stage: negotiate an upload slot and push the raw bytes.
//!
//! The vendor converts every non-PDF format to PDF server-side, so the
//! upload request only has to say whether conversion is needed.

use crate::client::EsignApi;
use crate::config::EsignConfig;
use crate::error::{EsignError, Result};
use crate::model::UploadSlotRequest;
use crate::pipeline::input::{self, AcquiredFile};
use crate::signer::content_md5;
use tracing::info;

/// Extensions the vendor accepts, grouped by family.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", // PDF
    "docx", "doc", "rtf", // Word
    "xlsx", "xls", // Excel
    "pptx", "ppt", // PowerPoint
    "wps", "et", "dps", // WPS Office
    "jpeg", "jpg", "png", "bmp", "tiff", "tif", "gif", // images
    "html", "htm", // HTML
];

/// Lowercased extension after the last `.`, if any.
fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Whether `file_name` has an extension the vendor can process.
pub fn is_file_supported(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn is_pdf(file_name: &str) -> bool {
    extension(file_name).as_deref() == Some("pdf")
}

fn supported_list() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Upload `file_ref` (local path or URL) as `file_name`; returns the file id.
///
/// Unsupported extensions are rejected before any I/O. A downloaded scratch
/// file is released on every path out of this function.
pub async fn upload(
    api: &dyn EsignApi,
    config: &EsignConfig,
    file_ref: &str,
    file_name: &str,
) -> Result<String> {
    if !is_file_supported(file_name) {
        return Err(EsignError::UnsupportedFileFormat {
            file_name: file_name.to_string(),
            supported: supported_list(),
        });
    }

    let acquired = input::resolve_input(file_ref, config).await?;
    let result = upload_acquired(api, &acquired, file_name).await;
    acquired.release();
    result
}

async fn upload_acquired(
    api: &dyn EsignApi,
    acquired: &AcquiredFile,
    file_name: &str,
) -> Result<String> {
    let path = acquired.path();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| EsignError::io(path, e))?;
    let md5 = content_md5(&bytes);
    let pdf = is_pdf(file_name);
    let content_type = if pdf {
        "application/pdf"
    } else {
        "application/octet-stream"
    };

    let request = UploadSlotRequest {
        content_md5: md5.clone(),
        content_type: content_type.to_string(),
        file_name: file_name.to_string(),
        file_size: bytes.len() as u64,
        convert_to_pdf: !pdf,
        // HTML conversion is never requested from this pipeline.
        convert_to_html: None,
    };
    info!(
        "Uploading '{}' ({} bytes, md5 {}, convert_to_pdf={})",
        file_name, request.file_size, md5, request.convert_to_pdf
    );

    let slot = api
        .request_upload_slot(&request)
        .await?
        .or_fail(|message| EsignError::UploadUrlRequestFailed { message })?;

    api.put_file(&slot.file_upload_url, bytes, content_type, &md5)
        .await?;

    info!("Uploaded '{}' as file {}", file_name, slot.file_id);
    Ok(slot.file_id)
}
