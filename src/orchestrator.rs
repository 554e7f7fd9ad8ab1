//! Polling loop.
//!
//! A single worker polls the adapter, routes whatever arrived and hands the
//! response back to the adapter. Cycles are separated by a fixed delay
//! measured from the end of the previous cycle, so they never overlap.

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::ChannelAdapter;
use crate::config::Config;
use crate::dispatcher::{self, DOCX_TO_JSON};
use crate::protocol;
use crate::types::Result;

lazy_static! {
    static ref BASE64_PAYLOAD: Regex =
        Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").expect("base64 pattern is valid");
}

/// Adapter shared between the worker and the shutdown path
pub type SharedAdapter = Arc<dyn ChannelAdapter>;

/// A request ready for the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: String,
    pub content: String,
}

/// Best-effort guess for untyped payloads: a long run of base64 is taken to
/// be an encoded document. Trailing whitespace is ignored.
pub fn looks_like_base64_document(input: &str, min_length: usize) -> bool {
    let candidate = input.trim_end();
    candidate.len() > min_length && BASE64_PAYLOAD.is_match(candidate)
}

/// Work out the request type for polled input.
///
/// `adapter_kind` is the type tag an adapter already decoded, if any.
/// Otherwise a raw request frame is decoded here and dispatched by its type.
/// Only text without frame markers falls back to the base64 guess or the
/// legacy echo.
pub fn classify(input: &str, adapter_kind: Option<&str>, legacy_min_length: usize) -> Request {
    if let Some(kind) = adapter_kind.filter(|k| !k.is_empty()) {
        return Request {
            kind: kind.to_string(),
            content: input.to_string(),
        };
    }

    // A frame is routed by its own type, even when that type is empty
    if let Some(frame) = protocol::decode_request(input) {
        return Request {
            kind: frame.kind,
            content: frame.content,
        };
    }

    untyped(input, legacy_min_length)
}

fn untyped(content: &str, legacy_min_length: usize) -> Request {
    let kind = if looks_like_base64_document(content, legacy_min_length) {
        debug!("Untyped payload looks like an encoded document");
        DOCX_TO_JSON
    } else {
        ""
    };
    Request {
        kind: kind.to_string(),
        content: content.to_string(),
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    adapter: SharedAdapter,
    poll_interval: Duration,
    shutdown_grace: Duration,
    legacy_min_length: usize,
}

impl Orchestrator {
    pub fn new(adapter: Box<dyn ChannelAdapter>, config: &Config) -> Self {
        Self {
            adapter: Arc::from(adapter),
            poll_interval: config.timing.poll_interval(),
            shutdown_grace: config.timing.shutdown_grace(),
            legacy_min_length: config.detection.legacy_min_length,
        }
    }

    pub fn adapter(&self) -> SharedAdapter {
        Arc::clone(&self.adapter)
    }

    pub fn initialize(&self) -> Result<()> {
        self.adapter.initialize()?;
        info!("Using {} adapter", self.adapter.name());
        Ok(())
    }

    /// Run one poll/dispatch/respond cycle. Returns whether a request was
    /// handled.
    pub fn tick(&self) -> Result<bool> {
        let Some(input) = self.adapter.poll()? else {
            return Ok(false);
        };
        if input.trim().is_empty() {
            return Ok(false);
        }

        let pending_kind = self.adapter.pending_kind();
        let request = classify(&input, pending_kind.as_deref(), self.legacy_min_length);
        info!(
            "Dispatching request - type: {:?}, {} chars",
            request.kind,
            request.content.len()
        );

        let response = dispatcher::dispatch(&request.kind, &request.content);
        self.adapter.write(&response)?;
        debug!("Cycle complete, {} chars returned", response.len());
        Ok(true)
    }

    /// Poll until `stop` flips to true or its sender is dropped.
    ///
    /// Each cycle runs on the blocking pool, so cancelling this future never
    /// waits on a cycle stuck on the medium.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        info!("Polling every {}ms", self.poll_interval.as_millis());

        loop {
            let stopped = *stop.borrow();
            if stopped {
                break;
            }

            let cycle = self.clone();
            match tokio::task::spawn_blocking(move || cycle.tick()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Processing cycle failed: {}", e),
                Err(e) => error!("Processing cycle panicked: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Polling stopped");
    }

    /// Start the worker on the runtime
    pub fn spawn(self) -> ServiceHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let adapter = self.adapter();
        let grace = self.shutdown_grace;
        let task = tokio::spawn(async move { self.run(stop_rx).await });

        ServiceHandle {
            stop: stop_tx,
            task,
            adapter,
            grace,
        }
    }
}

/// How the worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The in-flight cycle finished within the grace period
    Graceful,
    /// The worker was cancelled after the grace period
    Forced,
}

/// Handle to a running worker
pub struct ServiceHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    adapter: SharedAdapter,
    grace: Duration,
}

impl ServiceHandle {
    /// Stop polling, wait out the grace period, then release the adapter.
    ///
    /// A cycle still blocked on the medium after the grace period is left
    /// behind; the adapter drops anything it tries to do afterwards.
    pub async fn shutdown(mut self) -> ShutdownOutcome {
        info!("Shutting down...");
        let _ = self.stop.send(true);

        let outcome = match tokio::time::timeout(self.grace, &mut self.task).await {
            Ok(_) => ShutdownOutcome::Graceful,
            Err(_) => {
                warn!(
                    "Worker did not stop within {}ms, cancelling",
                    self.grace.as_millis()
                );
                self.task.abort();
                ShutdownOutcome::Forced
            }
        };

        if let Err(e) = self.adapter.shutdown() {
            error!("Error shutting down {} adapter: {}", self.adapter.name(), e);
        }

        outcome
    }
}
