//! Clipboard Bridge - request relay over a shared medium
//!
//! A client that cannot open a socket to this process leaves requests on a
//! medium both sides can reach, and picks responses up from the same place:
//!
//! - **Clipboard**: request and response frames ride on the system clipboard,
//!   carrying the user's own clipboard text along so it can be restored
//! - **Directory**: request files in `input/`, response files in `output/`
//!
//! # Architecture
//!
//! The [`Orchestrator`] polls one [`ChannelAdapter`] at a fixed delay, routes
//! each request through the [`dispatcher`] and writes the response back.
//! The only request type with real work behind it is `DOCX_TO_JSON`, served
//! by the [`document`] converter.

pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod document;
pub mod orchestrator;
pub mod protocol;
pub mod types;

// Re-export commonly used types
pub use adapters::{
    select_adapter, ChannelAdapter, ClipboardAdapter, ClipboardBackend, CommandClipboard,
    DirectoryAdapter, MemoryClipboard,
};
pub use config::{ChannelKind, Config};
pub use dispatcher::{dispatch, DOCX_TO_JSON};
pub use document::{convert_base64_docx_to_json, convert_docx_to_json};
pub use orchestrator::{Orchestrator, ServiceHandle, ShutdownOutcome};
pub use types::{BridgeError, Frame, Result, Role};
