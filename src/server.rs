//! MCP server over standard I/O.
//!
//! The session itself (handshake, `ping`, request ids, concurrent calls) is
//! run by `rmcp`. [`ToolRouter`] is the handler: `tools/list` returns
//! [`tool_definitions`], `tools/call` goes through [`ToolRouter::call`].
//!
//! ## Framing
//!
//! stdin is screened line by line before it reaches the session. A line that
//! is not UTF-8 JSON is answered with a -32700 error carrying a null id, a
//! request for a method the session cannot decode gets -32601 (or -32602
//! for a known method with bad params), and the line is dropped. The
//! session never sees it and keeps running.
//!
//! ```text
//! stdin ─▶ screen_input ─▶ rmcp session ─▶ write_lines ─▶ stdout
//!               └──────── rejections ────────────┘
//! ```
//!
//! stdout carries protocol messages only; all logging goes to stderr or the
//! log file.

use crate::tools::{tool_definitions, ToolRouter};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientJsonRpcMessage, ErrorData, Implementation,
    ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "esign-mcp";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Methods this server answers. A request for one of them that fails to
/// decode has bad params rather than an unknown method.
const KNOWN_METHODS: &[&str] = &["initialize", "ping", "tools/list", "tools/call"];

const PIPE_CAPACITY: usize = 64 * 1024;

impl ServerHandler for ToolRouter {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Use create_sign_flow to send a document for signature and \
                 query_sign_flow to check on it."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("tools/call {}", request.name);
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        Ok(self.call(&request.name, arguments).await.into())
    }
}

/// Serve on the process's stdin/stdout until stdin closes.
pub async fn run_stdio(router: ToolRouter) -> io::Result<()> {
    info!("Starting {} on stdio", SERVER_NAME);
    serve(router, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve one MCP session read from `reader`, writing to `writer`.
///
/// Returns when `reader` reaches EOF and the session has closed. Only a
/// failure to read or write the streams is an error.
pub async fn serve<R, W>(router: ToolRouter, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (to_session, session_in) = tokio::io::duplex(PIPE_CAPACITY);
    let (session_out, from_session) = tokio::io::duplex(PIPE_CAPACITY);
    let (reject_tx, reject_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let writer_task = tokio::spawn(write_lines(writer, from_session, reject_rx));
    let screen_task = tokio::spawn(screen_input(reader, to_session, reject_tx));

    match router.serve((session_in, session_out)).await {
        Ok(running) => {
            let reason = running.waiting().await.map_err(io::Error::other)?;
            info!("MCP session ended: {:?}", reason);
        }
        Err(e) => warn!("MCP session did not start: {}", e),
    }

    // The session is gone; stop reading and surface any read error.
    screen_task.abort();
    if let Ok(Err(e)) = screen_task.await {
        return Err(e);
    }
    writer_task.await.map_err(io::Error::other)?
}

/// What to do with one input line.
#[derive(Debug, PartialEq)]
enum Screened {
    /// Hand the line to the session.
    Forward,
    /// Answer it directly with this serialised error response.
    Reject(Vec<u8>),
    /// Blank lines and undecodable notifications.
    Skip,
}

fn screen_line(line: &[u8]) -> Screened {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Screened::Skip;
    }

    let value: Value = match std::str::from_utf8(line)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(text).map_err(|e| e.to_string()))
    {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparsable request: {}", e);
            let message = format!("Parse error: {e}");
            return Screened::Reject(error_line(Value::Null, PARSE_ERROR, message));
        }
    };

    let decode_error = match serde_json::from_value::<ClientJsonRpcMessage>(value.clone()) {
        Ok(_) => return Screened::Forward,
        Err(e) => e,
    };

    let id = value.get("id").filter(|id| !id.is_null()).cloned();
    match (id, value.get("method").and_then(Value::as_str)) {
        (Some(id), Some(method)) if KNOWN_METHODS.contains(&method) => Screened::Reject(error_line(
            id,
            INVALID_PARAMS,
            format!("Invalid params: {decode_error}"),
        )),
        (Some(id), Some(method)) => Screened::Reject(error_line(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )),
        (None, Some(method)) => {
            debug!("Ignoring notification: {}", method);
            Screened::Skip
        }
        (id, None) => Screened::Reject(error_line(
            id.unwrap_or(Value::Null),
            INVALID_REQUEST,
            format!("Invalid request: {decode_error}"),
        )),
    }
}

fn error_line(id: Value, code: i64, message: String) -> Vec<u8> {
    let response = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    });
    let mut line = response.to_string().into_bytes();
    line.push(b'\n');
    line
}

async fn screen_input<R>(
    reader: R,
    mut session: DuplexStream,
    rejects: mpsc::UnboundedSender<Vec<u8>>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            debug!("stdin closed");
            break;
        }
        match screen_line(&line) {
            Screened::Forward => {
                if !line.ends_with(b"\n") {
                    line.push(b'\n');
                }
                if session.write_all(&line).await.is_err() {
                    break;
                }
            }
            Screened::Reject(response) => {
                if rejects.send(response).is_err() {
                    break;
                }
            }
            Screened::Skip => {}
        }
    }
    let _ = session.shutdown().await;
    Ok(())
}

/// Copy session output and rejections to `writer`, one whole line at a time.
async fn write_lines<W>(
    mut writer: W,
    from_session: DuplexStream,
    mut rejects: mpsc::UnboundedReceiver<Vec<u8>>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut session = BufReader::new(from_session);
    let mut line = Vec::new();
    let mut session_open = true;
    let mut rejects_open = true;

    while session_open || rejects_open {
        tokio::select! {
            read = session.read_until(b'\n', &mut line), if session_open => {
                if read? == 0 {
                    session_open = false;
                } else {
                    writer.write_all(&line).await?;
                    writer.flush().await?;
                    line.clear();
                }
            }
            reject = rejects.recv(), if rejects_open => match reject {
                Some(response) => {
                    writer.write_all(&response).await?;
                    writer.flush().await?;
                }
                None => rejects_open = false,
            },
        }
    }
    Ok(())
}
