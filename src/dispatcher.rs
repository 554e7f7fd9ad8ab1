//! Request routing.
//!
//! Every request yields a string response. Failures are reported to the
//! client as a JSON error envelope:
//!
//! ```text
//! { "error": true, "message": "...", "timestamp": <epoch-ms> }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;

use tracing::{error, info, warn};

use crate::document;
use crate::types::Result;

/// Request type for document-to-JSON conversion
pub const DOCX_TO_JSON: &str = "DOCX_TO_JSON";

/// Known request types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    DocxToJson,
    /// No type header: echo the content back
    Legacy,
    Unknown(String),
}

impl RequestKind {
    /// Classify a type tag, ignoring case
    pub fn parse(kind: &str) -> Self {
        let normalized = kind.to_uppercase();
        match normalized.as_str() {
            DOCX_TO_JSON => RequestKind::DocxToJson,
            "" => RequestKind::Legacy,
            _ => RequestKind::Unknown(kind.to_string()),
        }
    }
}

/// Dispatch a request and return the response body. Never fails.
pub fn dispatch(kind: &str, content: &str) -> String {
    match RequestKind::parse(kind) {
        RequestKind::DocxToJson => match docx_to_json(content) {
            Ok(json) => json,
            Err(message) => error_envelope(&message),
        },
        RequestKind::Legacy => legacy_echo(content),
        RequestKind::Unknown(kind) => {
            warn!("Unknown request type: {}", kind);
            error_envelope(&format!("Unknown request type: {}", kind))
        }
    }
}

fn docx_to_json(content: &str) -> std::result::Result<String, String> {
    if content.trim().is_empty() {
        return Err("Empty DOCX content provided".to_string());
    }

    info!("Processing DOCX to JSON conversion ({} chars)", content.len());

    // The parser can panic on malformed packages; keep that inside the envelope.
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| convert(content)));
    match outcome {
        Ok(Ok(json)) => Ok(json),
        Ok(Err(e)) => {
            error!("DOCX conversion failed: {}", e);
            Err(format!("DOCX conversion failed: {}", e))
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!("DOCX conversion panicked: {}", reason);
            Err(format!("Processing error: {}", reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn convert(content: &str) -> Result<String> {
    document::convert_base64_docx_to_json(content.trim())
}

/// Response for requests without a type header
pub fn legacy_echo(content: &str) -> String {
    format!("Processed: {} [{}]", content, now_millis())
}

/// Uniform error response
pub fn error_envelope(message: &str) -> String {
    let envelope = serde_json::json!({
        "error": true,
        "message": message,
        "timestamp": now_millis(),
    });
    serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| {
        format!(
            "{{\"error\": true, \"message\": \"internal error\", \"timestamp\": {}}}",
            now_millis()
        )
    })
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
