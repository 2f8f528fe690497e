//! Vendor request signing.
//!
//! Every call to the Open API carries an `X-Tsign-Open-Ca-Signature` header:
//! an HMAC-SHA256 over a canonical string, keyed with the application
//! secret and base64-encoded. The canonical string is
//!
//! ```text
//! METHOD\n
//! */*\n            (Accept)
//! <Content-MD5>\n
//! <Content-Type>\n
//! \n               (Date, always empty)
//! [<headers>\n]    (signed custom headers, always empty here)
//! /path
//! ```
//!
//! with no trailing newline. The vendor recomputes it from the received
//! headers, so a single stray byte (trailing `\n`, lowercase method, query
//! string left on the path) fails authentication for every call.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `Accept` header and its slot in the canonical string.
pub const ACCEPT: &str = "*/*";

/// Computes request signatures with the shared application secret.
#[derive(Clone)]
pub struct RequestSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Signature for a request without signed custom headers.
    pub fn sign(&self, method: &str, path: &str, content_md5: &str, content_type: &str) -> String {
        let canonical = canonical_string(method, path, content_md5, content_type, "");
        tracing::trace!("Signing canonical request {:?}", canonical);
        self.sign_canonical(&canonical)
    }

    fn sign_canonical(&self, canonical: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(canonical.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// Build the canonical string the vendor verifies.
///
/// `headers` is the signed custom header block; when non-empty it is placed
/// on its own line before the path.
pub fn canonical_string(
    method: &str,
    path: &str,
    content_md5: &str,
    content_type: &str,
    headers: &str,
) -> String {
    let method = method.trim().to_uppercase();
    let path = normalize_path(path);

    let mut out = [method.as_str(), ACCEPT, content_md5, content_type, ""].join("\n");
    out.push('\n');
    if !headers.is_empty() {
        out.push_str(headers);
        out.push('\n');
    }
    out.push_str(&path);
    out
}

/// Strip the query string and guarantee a leading `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default().trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Base64 of the MD5 digest of `body`.
pub fn content_md5(body: &[u8]) -> String {
    STANDARD.encode(md5::compute(body).0)
}
