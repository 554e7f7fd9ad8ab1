//! Shared-clipboard channel.
//!
//! The client places a request frame on the clipboard with the user's
//! clipboard text as its residual. On the next poll the adapter decodes the
//! frame and puts the residual back straight away, before the request is
//! processed. The response is later written as a client frame wrapping
//! whatever the clipboard held at that point.
//!
//! Change detection compares against the last text this adapter saw or
//! wrote. The snapshot is kept in memory only, so after a restart a frame
//! still sitting on the clipboard is served again.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use super::ChannelAdapter;
use crate::config::ClipboardConfig;
use crate::protocol;
use crate::types::{BridgeError, Frame, Result, Role};

/// Text access to a clipboard
pub trait ClipboardBackend: Send {
    /// Current clipboard text, or `None` if it holds no text
    fn read_text(&mut self) -> Result<Option<String>>;

    /// Replace the clipboard text
    fn write_text(&mut self, text: &str) -> Result<()>;
}

// ============================================================================
// Command-line clipboard tools
// ============================================================================

/// Clipboard driven through the platform's command-line tools
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    read_command: Vec<String>,
    write_command: Vec<String>,
    /// Strip the line ending some tools append when printing
    strip_trailing_newline: bool,
}

impl CommandClipboard {
    pub fn new(read_command: Vec<String>, write_command: Vec<String>) -> Self {
        Self {
            read_command,
            write_command,
            strip_trailing_newline: false,
        }
    }

    /// Platform defaults, overridden by any commands set in config
    pub fn from_config(config: &ClipboardConfig) -> Self {
        let mut clipboard = Self::platform_default();
        if let Some(read) = &config.read_command {
            clipboard.read_command = read.clone();
            clipboard.strip_trailing_newline = false;
        }
        if let Some(write) = &config.write_command {
            clipboard.write_command = write.clone();
        }
        clipboard
    }

    #[cfg(target_os = "macos")]
    pub fn platform_default() -> Self {
        Self::new(strings(&["pbpaste"]), strings(&["pbcopy"]))
    }

    #[cfg(target_os = "windows")]
    pub fn platform_default() -> Self {
        let mut clipboard = Self::new(
            strings(&["powershell", "-NoProfile", "-Command", "Get-Clipboard -Raw"]),
            strings(&[
                "powershell",
                "-NoProfile",
                "-Command",
                "[Console]::In.ReadToEnd() | Set-Clipboard",
            ]),
        );
        clipboard.strip_trailing_newline = true;
        clipboard
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    pub fn platform_default() -> Self {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new(
                strings(&["wl-paste", "--no-newline"]),
                strings(&["wl-copy"]),
            )
        } else {
            Self::new(
                strings(&["xclip", "-selection", "clipboard", "-o"]),
                strings(&["xclip", "-selection", "clipboard", "-i"]),
            )
        }
    }

    fn command(parts: &[String]) -> Result<Command> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| BridgeError::Clipboard("empty clipboard command".to_string()))?;
        let mut command = Command::new(program);
        command.args(args);
        Ok(command)
    }
}

impl ClipboardBackend for CommandClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        let output = Self::command(&self.read_command)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                BridgeError::Clipboard(format!("{} failed to start: {}", self.read_command[0], e))
            })?;

        if !output.status.success() {
            // Most tools exit non-zero when the clipboard holds no text
            debug!(
                "Clipboard read exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if self.strip_trailing_newline && text.ends_with("\r\n") {
            text.truncate(text.len() - 2);
        }
        Ok(Some(text))
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut child = Self::command(&self.write_command)?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BridgeError::Clipboard(format!("{} failed to start: {}", self.write_command[0], e))
            })?;

        // stdin is closed at the end of the match so the tool sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        // Reap the child even when the write failed
        let output = child.wait_with_output()?;
        written?;
        if !output.status.success() {
            return Err(BridgeError::Clipboard(format!(
                "clipboard write exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// In-process clipboard
// ============================================================================

/// In-memory clipboard. Clones share the same contents, so a test or a demo
/// client can act as the user while the adapter owns another handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    text: Option<String>,
    writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let clipboard = Self::new();
        clipboard.set(text);
        clipboard
    }

    /// Replace the contents as a user copy would (not recorded in `writes`)
    pub fn set(&self, text: &str) {
        if let Ok(mut state) = self.inner.lock() {
            state.text = Some(text.to_string());
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|state| state.text.clone())
    }

    /// Every text written through the backend, oldest first
    pub fn writes(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|state| state.writes.clone())
            .unwrap_or_default()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| BridgeError::Clipboard("clipboard lock poisoned".to_string()))?;
        Ok(state.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| BridgeError::Clipboard("clipboard lock poisoned".to_string()))?;
        state.text = Some(text.to_string());
        state.writes.push(text.to_string());
        Ok(())
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Channel adapter over a clipboard backend
pub struct ClipboardAdapter<B: ClipboardBackend> {
    backend: Mutex<B>,
    state: Mutex<ClipboardState>,
    closed: AtomicBool,
}

#[derive(Default)]
struct ClipboardState {
    /// Last clipboard text observed or written by us
    last_seen: String,
    /// Request awaiting a response
    pending: Option<Frame>,
}

impl<B: ClipboardBackend> ClipboardAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
            state: Mutex::new(ClipboardState::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn pending(&self) -> Option<Frame> {
        self.state().pending.clone()
    }

    fn backend(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Held only for bookkeeping, never across clipboard calls
    fn state(&self) -> MutexGuard<'_, ClipboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Put the user's content back on the clipboard
    fn restore(&self, residual: &str) {
        let restored = self.backend().write_text(residual);
        match restored {
            Ok(()) => {
                self.state().last_seen = residual.to_string();
                debug!("Restored original clipboard content");
            }
            Err(e) => error!("Error restoring clipboard: {}", e),
        }
    }
}

impl<B: ClipboardBackend> ChannelAdapter for ClipboardAdapter<B> {
    fn initialize(&self) -> Result<()> {
        info!("Clipboard adapter initialized - monitoring clipboard");
        Ok(())
    }

    fn poll(&self) -> Result<Option<String>> {
        if self.is_closed() {
            return Ok(None);
        }

        let current = self.backend().read_text()?;
        let Some(current) = current else {
            return Ok(None);
        };

        let frame = {
            let mut state = self.state();
            if current == state.last_seen {
                return Ok(None);
            }
            let frame = protocol::decode_request(&current);
            state.last_seen = current;
            match frame {
                Some(frame) => frame,
                None => return Ok(None),
            }
        };

        self.restore(&frame.residual);

        info!(
            "Request received - type: {:?}, content: {} chars",
            frame.kind,
            frame.content.len()
        );

        let content = frame.content.clone();
        let previous = self.state().pending.replace(frame);
        if let Some(previous) = previous {
            warn!(
                "Replacing unanswered {:?} request with a newer one",
                previous.kind
            );
        }
        Ok(Some(content))
    }

    fn write(&self, output: &str) -> Result<()> {
        if self.is_closed() {
            warn!("Clipboard adapter is shut down, dropping response");
            return Ok(());
        }

        let request = self.state().pending.take();
        let Some(request) = request else {
            info!("No pending request to respond to");
            return Ok(());
        };

        let kind = request.result_kind();
        let message = {
            let mut backend = self.backend();
            let current = match backend.read_text() {
                Ok(text) => text.unwrap_or_default(),
                Err(e) => {
                    warn!("Error reading current clipboard: {}", e);
                    String::new()
                }
            };
            let message = protocol::encode(Role::Client, &kind, output, Some(&current));
            backend.write_text(&message)?;
            message
        };
        self.state().last_seen = message;

        info!("Response sent - type: {}, {} chars", kind, output.len());
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let unanswered = self.state().pending.take();
        if let Some(request) = unanswered {
            warn!("Shutting down with unanswered {:?} request", request.kind);
        }
        info!("Clipboard adapter shutting down");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn pending_kind(&self) -> Option<String> {
        self.state().pending.as_ref().map(|frame| frame.kind.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_response, encode, CLIENT_INDICATOR};

    fn request(kind: &str, content: &str, residual: &str) -> String {
        encode(Role::Server, kind, content, Some(residual))
    }

    #[test]
    fn test_ordinary_content_is_ignored() {
        let clipboard = MemoryClipboard::with_text("shopping list");
        let adapter = ClipboardAdapter::new(clipboard.clone());

        assert_eq!(adapter.poll().unwrap(), None);
        assert!(adapter.pending().is_none());
        assert!(clipboard.writes().is_empty());
    }

    #[test]
    fn test_poll_restores_residual_immediately() {
        let clipboard = MemoryClipboard::with_text(&request("ECHO", "payload", "user text"));
        let adapter = ClipboardAdapter::new(clipboard.clone());

        let content = adapter.poll().unwrap();
        assert_eq!(content.as_deref(), Some("payload"));
        assert_eq!(clipboard.get().as_deref(), Some("user text"));
        assert_eq!(adapter.pending_kind().as_deref(), Some("ECHO"));
    }

    #[test]
    fn test_same_snapshot_is_not_seen_twice() {
        let clipboard = MemoryClipboard::with_text(&request("ECHO", "payload", "user text"));
        let adapter = ClipboardAdapter::new(clipboard.clone());

        assert!(adapter.poll().unwrap().is_some());
        // Clipboard now holds the restored residual, which we wrote ourselves
        assert_eq!(adapter.poll().unwrap(), None);
        assert_eq!(clipboard.writes().len(), 1);
    }

    #[test]
    fn test_write_without_pending_is_noop() {
        let clipboard = MemoryClipboard::with_text("untouched");
        let adapter = ClipboardAdapter::new(clipboard.clone());

        adapter.write("result").unwrap();
        assert_eq!(clipboard.get().as_deref(), Some("untouched"));
        assert!(clipboard.writes().is_empty());
    }

    #[test]
    fn test_write_wraps_current_clipboard() {
        let clipboard = MemoryClipboard::with_text(&request("DOCX_TO_JSON", "abc", "before"));
        let adapter = ClipboardAdapter::new(clipboard.clone());
        adapter.poll().unwrap();

        // User copies something else while the request is processed
        clipboard.set("copied meanwhile");
        adapter.write("{\"ok\":true}").unwrap();

        let raw = clipboard.get().unwrap();
        assert!(raw.starts_with(CLIENT_INDICATOR));
        let response = decode_response(&raw).unwrap();
        assert_eq!(response.kind, "DOCX_TO_JSON_RESULT");
        assert_eq!(response.content, "{\"ok\":true}");
        assert_eq!(response.residual, "copied meanwhile");
        assert!(adapter.pending().is_none());

        // Our own response is not mistaken for new input
        assert_eq!(adapter.poll().unwrap(), None);
    }

    #[test]
    fn test_newer_request_replaces_pending() {
        let clipboard = MemoryClipboard::with_text(&request("FIRST", "1", "orig"));
        let adapter = ClipboardAdapter::new(clipboard.clone());
        adapter.poll().unwrap();

        clipboard.set(&request("SECOND", "2", "orig"));
        assert_eq!(adapter.poll().unwrap().as_deref(), Some("2"));
        assert_eq!(adapter.pending().unwrap().kind, "SECOND");
    }

    struct FailingWrites;

    impl ClipboardBackend for FailingWrites {
        fn read_text(&mut self) -> Result<Option<String>> {
            Ok(Some(encode(Role::Server, "ECHO", "x", Some("orig"))))
        }

        fn write_text(&mut self, _text: &str) -> Result<()> {
            Err(BridgeError::Clipboard("locked by another process".to_string()))
        }
    }

    #[test]
    fn test_failed_response_still_clears_pending() {
        let adapter = ClipboardAdapter::new(FailingWrites);
        assert_eq!(adapter.poll().unwrap().as_deref(), Some("x"));

        assert!(adapter.write("result").is_err());
        assert!(adapter.pending().is_none());
    }

    #[test]
    fn test_command_clipboard_rejects_empty_command() {
        let mut clipboard = CommandClipboard::new(vec![], vec![]);
        assert!(clipboard.write_text("x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_write_to_exited_tool_reports_error() {
        // `true` exits without reading, so the pipe breaks mid-write
        let mut clipboard = CommandClipboard::new(strings(&["true"]), strings(&["true"]));
        let text = "x".repeat(1 << 20);

        let err = clipboard.write_text(&text).unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_write_failure_status() {
        let mut clipboard = CommandClipboard::new(strings(&["true"]), strings(&["false"]));
        let err = clipboard.write_text("x").unwrap_err();
        assert!(matches!(err, BridgeError::Clipboard(_)), "{}", err);
    }

    #[test]
    fn test_shutdown_releases_clipboard() {
        let clipboard = MemoryClipboard::with_text(&request("ECHO", "payload", "user text"));
        let adapter = ClipboardAdapter::new(clipboard.clone());
        assert!(adapter.poll().unwrap().is_some());

        adapter.shutdown().unwrap();
        assert!(adapter.pending().is_none());

        // A late response from a cycle that outlived shutdown is dropped
        adapter.write("late").unwrap();
        clipboard.set(&request("ECHO", "again", "other"));
        assert_eq!(adapter.poll().unwrap(), None);
        assert_eq!(clipboard.writes(), vec!["user text".to_string()]);
    }
}
