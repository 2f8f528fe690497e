//! Tool surface: definitions, argument decoding and text rendering.
//!
//! [`ToolRouter::call`] is the only boundary where [`EsignError`] becomes
//! text. Every failure, including bad arguments and missing configuration,
//! is answered with a tool result rather than a protocol error.

use crate::config::{missing_config_guidance, EsignConfig};
use crate::error::{EsignError, Result};
use crate::service::{EsignService, SignRequest};
use rmcp::model::{CallToolResult, Content, Tool};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const CREATE_SIGN_FLOW: &str = "create_sign_flow";
pub const QUERY_SIGN_FLOW: &str = "query_sign_flow";

fn input_schema(schema: Value) -> Arc<Map<String, Value>> {
    match schema {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(Map::new()),
    }
}

/// Tools advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            CREATE_SIGN_FLOW,
            "Create a sign flow for a document and return the signing link. \
                Supports PDF, Word, Excel, PowerPoint, WPS, images and HTML; \
                non-PDF files are converted to PDF by the vendor.",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "Local file path or HTTP(S) download URL. Supported formats: \
                            PDF (.pdf), Word (.docx/.doc/.rtf), Excel (.xlsx/.xls), \
                            PowerPoint (.pptx/.ppt), WPS (.wps/.et/.dps), \
                            images (.jpg/.png/.bmp/...), HTML (.html/.htm)"
                    },
                    "fileName": {
                        "type": "string",
                        "description": "File name including an extension that matches the \
                            actual format, e.g. contract.pdf or notes.docx"
                    },
                    "receiverPhone": {
                        "type": "string",
                        "description": "Signer's mobile number; receives the SMS notification"
                    },
                    "username": {
                        "type": "string",
                        "description": "Signer's name. Optional; required only when the signer \
                            has no existing e-sign account"
                    }
                },
                "required": ["filePath", "fileName", "receiverPhone"]
            })),
        ),
        Tool::new(
            QUERY_SIGN_FLOW,
            "Query sign flow details",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "flowId": {
                        "type": "string",
                        "description": "Sign flow ID"
                    }
                },
                "required": ["flowId"]
            })),
        ),
    ]
}

/// Text answer of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
}

impl ToolReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

impl From<ToolReply> for CallToolResult {
    fn from(reply: ToolReply) -> Self {
        let content = vec![Content::text(reply.text)];
        if reply.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryArgs {
    flow_id: String,
}

fn decode_args<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| EsignError::InvalidArguments(e.to_string()))
}

/// Dispatches tool calls to an [`EsignService`], or answers every call with
/// setup guidance when the service could not be configured.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    service: std::result::Result<Arc<EsignService>, Vec<&'static str>>,
}

impl ToolRouter {
    pub fn new(service: EsignService) -> Self {
        Self {
            service: Ok(Arc::new(service)),
        }
    }

    /// A router that only reports which settings are missing.
    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self {
            service: Err(missing),
        }
    }

    /// Build from a configuration attempt. Missing settings yield an
    /// unconfigured router; any other error is returned.
    pub fn from_config(config: Result<EsignConfig>) -> Result<Self> {
        match config {
            Ok(config) => Ok(Self::new(EsignService::new(config)?)),
            Err(EsignError::ConfigurationMissing { missing }) => {
                warn!("Missing configuration: {}", missing.join(", "));
                Ok(Self::unconfigured(missing))
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.service.is_ok()
    }

    /// Run tool `name`. Never fails; errors are rendered as `Error: ...`.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolReply {
        let service = match &self.service {
            Ok(service) => service,
            Err(missing) => return ToolReply::error(missing_config_guidance(missing)),
        };

        let result = match name {
            CREATE_SIGN_FLOW => Self::create_sign_flow(service, arguments).await,
            QUERY_SIGN_FLOW => Self::query_sign_flow(service, arguments).await,
            _ => {
                warn!("Unknown tool requested: {}", name);
                return ToolReply::error("Error: Unknown tool");
            }
        };

        match result {
            Ok(text) => {
                info!("Tool {} succeeded", name);
                ToolReply::text(text)
            }
            Err(e) => {
                error!("Tool {} failed: {}", name, e);
                ToolReply::error(format!("Error: {e}"))
            }
        }
    }

    async fn create_sign_flow(service: &EsignService, arguments: Value) -> Result<String> {
        let request: SignRequest = decode_args(arguments)?;
        let created = service.create_sign_flow(&request).await?;
        Ok(format!(
            "Success!\nFlow ID: {}\nSign URL: {}",
            created.flow_id, created.sign_url
        ))
    }

    async fn query_sign_flow(service: &EsignService, arguments: Value) -> Result<String> {
        let args: QueryArgs = decode_args(arguments)?;
        let summary = service.query_sign_flow(&args.flow_id).await?;
        Ok(summary.to_string())
    }
}
