//! Pipeline stages for creating a sign flow.
//!
//! Each submodule implements exactly one step. Stages that reach the vendor
//! do so only through [`crate::client::EsignApi`] and can be exercised
//! against a scripted fake.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ upload ──▶ watch ──▶ flow
//! (URL/path) (slot+PUT) (poll)   (create + sign URL)
//! ```
//!
//! 1. [`input`]: resolve the user-supplied path or URL to a local file,
//!    owning any downloaded scratch copy
//! 2. [`upload`]: extension check, upload slot, raw PUT; returns the file id
//! 3. [`watch`]: fixed-interval poll until the vendor finished conversion
//! 4. [`flow`]: create the flow, fetch the signing link, render details

pub mod flow;
pub mod input;
pub mod upload;
pub mod watch;
