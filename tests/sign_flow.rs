//! End-to-end tool tests: `ToolRouter` → service → signed client → mock vendor.
//!
//! Run with:
//!   cargo test --test sign_flow

use esign_mcp::signer::content_md5;
use esign_mcp::{EsignConfig, EsignService, ToolRouter};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj<<>>endobj\ntrailer<<>>\n%%EOF\n";

struct Harness {
    server: MockServer,
    router: ToolRouter,
    scratch: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let scratch = tempfile::tempdir().unwrap();
        let config = EsignConfig::builder()
            .host(server.uri())
            .app_id("app-1")
            .app_secret("secret")
            .poll_interval(Duration::from_millis(10))
            .scratch_dir(scratch.path())
            .build()
            .unwrap();
        let router = ToolRouter::new(EsignService::new(config).unwrap());
        Self {
            server,
            router,
            scratch,
        }
    }

    async fn call(&self, tool: &str, arguments: Value) -> (bool, String) {
        let result = self.router.call(tool, arguments).await;
        (result.is_error, result.text)
    }

    async fn requests_to(&self, p: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == p)
            .collect()
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().count() == 0
    }

    async fn mount_upload_slot(&self) {
        Mock::given(method("POST"))
            .and(path("/v3/files/file-upload-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {
                    "fileId": "file-1",
                    "fileUploadUrl": format!("{}/upload/file-1", self.server.uri())
                }
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/file-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    async fn mount_file_status(&self, codes: &[i64]) {
        let (last, leading) = codes.split_last().unwrap();
        for code in leading {
            Mock::given(method("GET"))
                .and(path("/v3/files/file-1"))
                .respond_with(status_body(*code))
                .up_to_n_times(1)
                .with_priority(1)
                .mount(&self.server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v3/files/file-1"))
            .respond_with(status_body(*last))
            .mount(&self.server)
            .await;
    }

    async fn mount_flow(&self) {
        Mock::given(method("POST"))
            .and(path("/v3/sign-flow/create-by-file"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"signFlowId": "flow-1"}
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/sign-flow/flow-1/sign-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"url": "https://esign.example/sign/long", "shortUrl": "https://s.example/x1"}
            })))
            .mount(&self.server)
            .await;
    }
}

fn status_body(code: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 0,
        "data": {"fileId": "file-1", "fileStatus": code}
    }))
}

fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

fn write_pdf(dir: &Path) -> String {
    let file = dir.join("contract.pdf");
    std::fs::write(&file, PDF_BYTES).unwrap();
    file.to_string_lossy().into_owned()
}

// ── create_sign_flow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn local_pdf_creates_flow_and_returns_short_link() {
    let h = Harness::start().await;
    h.mount_upload_slot().await;
    h.mount_file_status(&[1, 4, 2]).await;
    h.mount_flow().await;

    let docs = tempfile::tempdir().unwrap();
    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": write_pdf(docs.path()),
                "fileName": "contract.pdf",
                "receiverPhone": "13800000000",
                "username": ""
            }),
        )
        .await;

    assert!(!is_error, "{text}");
    assert_eq!(
        text,
        "Success!\nFlow ID: flow-1\nSign URL: https://s.example/x1"
    );

    let slot = &h.requests_to("/v3/files/file-upload-url").await[0];
    let slot_body = body_json(slot);
    assert_eq!(slot_body["contentType"], json!("application/pdf"));
    assert_eq!(slot_body["convertToPDF"], json!(false));
    assert_eq!(slot_body["fileSize"], json!(PDF_BYTES.len()));
    assert_eq!(slot_body["contentMd5"], json!(content_md5(PDF_BYTES)));

    let put = &h.requests_to("/upload/file-1").await[0];
    assert_eq!(put.body, PDF_BYTES);

    assert_eq!(h.requests_to("/v3/files/file-1").await.len(), 3);

    let flow = body_json(&h.requests_to("/v3/sign-flow/create-by-file").await[0]);
    assert_eq!(flow["docs"][0], json!({"fileId": "file-1", "fileName": "contract.pdf"}));
    let signer = &flow["signers"][0]["psnSignerInfo"];
    assert_eq!(signer["psnAccount"], json!("13800000000"));
    assert!(signer.get("psnInfo").is_none());

    let link = body_json(&h.requests_to("/v3/sign-flow/flow-1/sign-url").await[0]);
    assert_eq!(
        link,
        json!({
            "needLogin": false,
            "urlType": 2,
            "operator": {"psnAccount": "13800000000"},
            "clientType": "ALL"
        })
    );
}

#[tokio::test]
async fn remote_docx_is_downloaded_converted_and_cleaned_up() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/files/notes.docx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04docx".to_vec()))
        .mount(&h.server)
        .await;
    h.mount_upload_slot().await;
    h.mount_file_status(&[8, 5]).await;
    h.mount_flow().await;

    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": format!("{}/files/notes.docx", h.server.uri()),
                "fileName": "notes.docx",
                "receiverPhone": "13800000000",
                "username": "张三"
            }),
        )
        .await;

    assert!(!is_error, "{text}");
    assert!(text.contains("Flow ID: flow-1"));

    let slot_body = body_json(&h.requests_to("/v3/files/file-upload-url").await[0]);
    assert_eq!(slot_body["contentType"], json!("application/octet-stream"));
    assert_eq!(slot_body["convertToPDF"], json!(true));

    let put = &h.requests_to("/upload/file-1").await[0];
    assert_eq!(put.body, b"PK\x03\x04docx");

    let flow = body_json(&h.requests_to("/v3/sign-flow/create-by-file").await[0]);
    assert_eq!(
        flow["signers"][0]["psnSignerInfo"]["psnInfo"],
        json!({"psnName": "张三"})
    );

    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn scratch_file_is_removed_when_upload_slot_is_refused() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BYTES.to_vec()))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/files/file-upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1_560_001,
            "message": "quota exceeded"
        })))
        .mount(&h.server)
        .await;

    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": format!("{}/files/a.pdf", h.server.uri()),
                "fileName": "a.pdf",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert_eq!(text, "Error: Failed to get upload URL: quota exceeded");
    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn failed_download_never_reaches_the_vendor() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;

    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": format!("{}/files/gone.pdf", h.server.uri()),
                "fileName": "gone.pdf",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert!(text.starts_with("Error: Failed to download"), "{text}");
    assert!(text.contains("404"), "{text}");
    assert!(h.requests_to("/v3/files/file-upload-url").await.is_empty());
    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn unsupported_extension_makes_no_requests() {
    let h = Harness::start().await;

    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": format!("{}/files/archive.zip", h.server.uri()),
                "fileName": "archive.zip",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert!(text.contains("Unsupported file format"), "{text}");
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn conversion_failure_stops_before_flow_creation() {
    let h = Harness::start().await;
    h.mount_upload_slot().await;
    h.mount_file_status(&[8, 9]).await;
    h.mount_flow().await;

    let docs = tempfile::tempdir().unwrap();
    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": write_pdf(docs.path()),
                "fileName": "contract.pdf",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert_eq!(text, "Error: File processing failed: status 9");
    assert!(h.requests_to("/v3/sign-flow/create-by-file").await.is_empty());
}

#[tokio::test]
async fn rejected_upload_put_is_reported() {
    let h = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/files/file-upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "fileId": "file-1",
                "fileUploadUrl": format!("{}/upload/file-1", h.server.uri())
            }
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/file-1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&h.server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": write_pdf(docs.path()),
                "fileName": "contract.pdf",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert_eq!(text, "Error: Failed to upload file: HTTP 403");
}

#[tokio::test]
async fn flow_creation_rejection_carries_vendor_message() {
    let h = Harness::start().await;
    h.mount_upload_slot().await;
    h.mount_file_status(&[2]).await;
    Mock::given(method("POST"))
        .and(path("/v3/sign-flow/create-by-file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1_435_011,
            "message": "签署人姓名不能为空"
        })))
        .mount(&h.server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    let (is_error, text) = h
        .call(
            "create_sign_flow",
            json!({
                "filePath": write_pdf(docs.path()),
                "fileName": "contract.pdf",
                "receiverPhone": "13800000000"
            }),
        )
        .await;

    assert!(is_error);
    assert_eq!(text, "Error: Sign flow creation failed: 签署人姓名不能为空");
}

// ── query_sign_flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn query_renders_summary() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/sign-flow/flow-1/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "signFlowStatus": 2,
                "signFlowDescription": "所有签署人完成签署",
                "signFlowCreateTime": 1_700_000_000_000i64,
                "signFlowStartTime": 1_700_000_000_000i64,
                "signFlowFinishTime": 1_700_000_060_000i64,
                "docs": [{"fileId": "file-1", "fileName": "contract.pdf"}],
                "signers": [{
                    "signerType": 0,
                    "psnSigner": {
                        "psnName": "张三",
                        "psnAccount": {"accountMobile": "13800000000"}
                    }
                }]
            }
        })))
        .mount(&h.server)
        .await;

    let (is_error, text) = h.call("query_sign_flow", json!({"flowId": "flow-1"})).await;

    assert!(!is_error, "{text}");
    assert!(text.starts_with("Sign flow details:"), "{text}");
    assert!(text.contains("Status: completed (所有签署人完成签署)"), "{text}");
    assert!(text.contains("Finished: 2023-11-14 22:14:20 UTC"), "{text}");
    assert!(text.contains("Documents: contract.pdf"), "{text}");
    assert!(text.contains("Signers: 张三 (13800000000)"), "{text}");
}

#[tokio::test]
async fn query_failure_is_error_text() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/sign-flow/nope/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1_435_002,
            "message": "flow not found"
        })))
        .mount(&h.server)
        .await;

    let (is_error, text) = h.call("query_sign_flow", json!({"flowId": "nope"})).await;

    assert!(is_error);
    assert_eq!(text, "Error: Failed to get sign flow detail: flow not found");
}
