//! # esign-mcp
//!
//! An MCP server that lets an assistant send a document out for electronic
//! signature through the e-sign Open API v3, and check on it later.
//!
//! ## Why this crate?
//!
//! Starting a signature on the vendor side takes five signed HTTP exchanges,
//! a raw upload to a pre-signed URL and a polling loop while the vendor
//! converts the document. This crate hides all of it behind two tools:
//! `create_sign_flow` returns a signing link, `query_sign_flow` returns a
//! human-readable status summary.
//!
//! ## Pipeline Overview
//!
//! ```text
//! filePath (local or URL)
//!  │
//!  ├─ 1. Input   resolve local path or download to a scratch file
//!  ├─ 2. Upload  request upload slot (MD5, size, convert flag) → raw PUT
//!  ├─ 3. Watch   poll file status every 2 s, at most 30 times
//!  ├─ 4. Flow    create-by-file: one signer, SMS notice, 7-day expiry
//!  └─ 5. Link    sign-url for the signer's mobile number
//! ```
//!
//! Every vendor call is signed by [`signer::RequestSigner`] (HMAC-SHA256 over
//! a canonical request string).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use esign_mcp::{EsignConfig, EsignService, SignRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // HOST, APP_ID and APP_SECRET from the environment
//!     let service = EsignService::new(EsignConfig::from_env()?)?;
//!     let created = service
//!         .create_sign_flow(&SignRequest {
//!             file_path: "contract.pdf".into(),
//!             file_name: "contract.pdf".into(),
//!             receiver_phone: "13800000000".into(),
//!             username: None,
//!         })
//!         .await?;
//!     println!("{}", created.sign_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `esign-mcp` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library:
//! ```toml
//! esign-mcp = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod signer;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{EsignApi, EsignClient};
pub use config::{EsignConfig, EsignConfigBuilder, PRODUCTION_HOST, SANDBOX_HOST};
pub use error::{EsignError, Result};
pub use model::{ApiOutcome, FileStatus, FlowStatus, Readiness};
pub use pipeline::flow::FlowSummary;
pub use server::{run_stdio, serve};
pub use service::{CreatedSignFlow, EsignService, SignRequest};
pub use signer::RequestSigner;
pub use tools::{ToolReply, ToolRouter};
