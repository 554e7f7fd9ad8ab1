//! Channel adapters over the shared medium.
//!
//! Two media are supported:
//! - Clipboard: frames are embedded in the system clipboard text
//! - Directory: request files in `input/`, response files in `output/`
//!
//! Both implement [`ChannelAdapter`]; the orchestrator only ever sees the
//! trait object chosen by [`select_adapter`].

pub mod clipboard;
pub mod directory;

use crate::config::{ChannelKind, Config};
use crate::types::Result;
use tracing::info;

pub use clipboard::{ClipboardAdapter, ClipboardBackend, CommandClipboard, MemoryClipboard};
pub use directory::DirectoryAdapter;

/// Polling contract shared by every medium.
///
/// `poll` and `write` are only called from one worker at a time. `shutdown`
/// may arrive while that worker is still blocked on the medium, so the state
/// it touches must never be locked across medium I/O.
pub trait ChannelAdapter: Send + Sync {
    /// Prepare the medium (create directories, announce readiness)
    fn initialize(&self) -> Result<()>;

    /// Return new request content, or `None` if nothing arrived.
    ///
    /// Adapters that understand frames return the unwrapped content; others
    /// return the raw text and leave classification to the orchestrator.
    fn poll(&self) -> Result<Option<String>>;

    /// Deliver a response for the most recent request
    fn write(&self, output: &str) -> Result<()>;

    /// Release the medium. Later polls and writes leave it untouched.
    fn shutdown(&self) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Type tag of the request returned by the last `poll`, for adapters
    /// that decode frames themselves
    fn pending_kind(&self) -> Option<String> {
        None
    }
}

/// Build the adapter for the configured channel
pub fn select_adapter(config: &Config) -> Box<dyn ChannelAdapter> {
    let kind = config.channel.kind.resolve();
    info!("Selected {} channel", kind.as_str());

    match kind {
        ChannelKind::Clipboard => {
            let backend = CommandClipboard::from_config(&config.clipboard);
            Box::new(ClipboardAdapter::new(backend))
        }
        ChannelKind::Directory | ChannelKind::Auto => {
            Box::new(DirectoryAdapter::new(config.channel.workspace_dir()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelKind;

    #[test]
    fn test_select_directory_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.channel.kind = ChannelKind::Directory;
        config.channel.workspace_dir = Some(dir.path().to_path_buf());

        let adapter = select_adapter(&config);
        assert_eq!(adapter.name(), "directory");
    }

    #[test]
    fn test_select_clipboard_adapter() {
        let mut config = Config::default();
        config.channel.kind = ChannelKind::Clipboard;

        let adapter = select_adapter(&config);
        assert_eq!(adapter.name(), "clipboard");
    }
}
