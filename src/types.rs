//! Core types used throughout the bridge.
//!
//! This module defines the fundamental data structures shared by the codec,
//! the channel adapters and the orchestrator:
//! - `Role`: which side of the exchange authored a frame
//! - `Frame`: a decoded request or response
//! - `BridgeError`: errors raised by adapters, the converter and config loading

use thiserror::Error;

/// Which party authored a frame on the shared medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Frames written by the client for the server to pick up (requests)
    Server,
    /// Frames written by the server for the client to pick up (responses)
    Client,
}

/// A message embedded in the shared medium.
///
/// `residual` is whatever occupied the medium around the frame: for requests
/// it is the user's content to restore, for responses it is the content that
/// was current when the response was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub role: Role,
    /// Request type, e.g. `DOCX_TO_JSON`. Empty for legacy payloads.
    pub kind: String,
    pub content: String,
    pub residual: String,
}

impl Frame {
    pub fn new(
        role: Role,
        kind: impl Into<String>,
        content: impl Into<String>,
        residual: impl Into<String>,
    ) -> Self {
        Self {
            role,
            kind: kind.into(),
            content: content.into(),
            residual: residual.into(),
        }
    }

    /// Type tag carried by the response to this frame
    pub fn result_kind(&self) -> String {
        format!("{}_RESULT", self.kind)
    }
}

/// Errors that can occur while moving requests across a channel or
/// processing them
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
