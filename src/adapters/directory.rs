//! Directory queue channel.
//!
//! Layout under the workspace:
//!
//! ```text
//! <workspace>/input/   request files (*.txt), renamed to processed_<name> once read
//! <workspace>/output/  one output_<epoch-ms>.txt per response
//! ```
//!
//! Files are consumed in name order. Request files carry either a full
//! request frame or untyped legacy text; the orchestrator classifies them.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::ChannelAdapter;
use crate::dispatcher::now_millis;
use crate::types::Result;

pub const README_NAME: &str = "README.txt";
pub const PROCESSED_PREFIX: &str = "processed_";

const README_TEXT: &str = "DMDC GPT Linux Input Directory\n\n\
Place .txt files here for processing.\n\
Files will be moved to processed_<filename> after reading.\n";

pub struct DirectoryAdapter {
    workspace: PathBuf,
    input_dir: PathBuf,
    output_dir: PathBuf,
    /// Names consumed during this run
    processed: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl DirectoryAdapter {
    pub fn new(workspace: PathBuf) -> Self {
        let input_dir = workspace.join("input");
        let output_dir = workspace.join("output");
        Self {
            workspace,
            input_dir,
            output_dir,
            processed: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn processed(&self) -> MutexGuard<'_, HashSet<String>> {
        self.processed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Request files not yet renamed, sorted by name
    fn request_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.input_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(".txt")
                && name != README_NAME
                && !name.starts_with(PROCESSED_PREFIX)
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Claim the first file not seen this run. The name is recorded before
    /// reading so a bad file is not retried every cycle.
    fn claim_next(&self, names: Vec<String>) -> Option<String> {
        let mut processed = self.processed();
        let name = names.into_iter().find(|name| !processed.contains(name))?;
        processed.insert(name.clone());
        Some(name)
    }

    /// Create a fresh output file, suffixing the name if the millisecond
    /// stamp is already taken
    fn create_output_file(&self) -> Result<(PathBuf, fs::File)> {
        let stamp = now_millis();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("output_{}.txt", stamp)
            } else {
                format!("output_{}-{}.txt", stamp, attempt)
            };
            let path = self.output_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ChannelAdapter for DirectoryAdapter {
    fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.input_dir)?;
        fs::create_dir_all(&self.output_dir)?;

        let readme = self.input_dir.join(README_NAME);
        if !readme.exists() {
            fs::write(&readme, README_TEXT)?;
        }

        info!("Directory adapter initialized at {:?}", self.workspace);
        info!("Input directory: {:?}", self.input_dir);
        info!("Output directory: {:?}", self.output_dir);
        Ok(())
    }

    fn poll(&self) -> Result<Option<String>> {
        if self.is_closed() || !self.input_dir.is_dir() {
            return Ok(None);
        }

        let names = self.request_files()?;
        let Some(name) = self.claim_next(names) else {
            return Ok(None);
        };

        let path = self.input_dir.join(&name);
        let content = fs::read_to_string(&path)?;

        let consumed = self.input_dir.join(format!("{}{}", PROCESSED_PREFIX, name));
        if let Err(e) = fs::rename(&path, &consumed) {
            warn!("Could not mark {} as processed: {}", name, e);
        }

        info!("Read input from {} ({} chars)", name, content.len());
        Ok(Some(content))
    }

    fn write(&self, output: &str) -> Result<()> {
        if self.is_closed() {
            warn!("Directory adapter is shut down, dropping response");
            return Ok(());
        }

        fs::create_dir_all(&self.output_dir)?;
        let (path, mut file) = self.create_output_file()?;
        file.write_all(output.as_bytes())?;
        info!("Wrote output to {:?}", path);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("Consumed {} files this run", self.processed().len());
        info!("Directory adapter shutting down");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn adapter() -> (tempfile::TempDir, DirectoryAdapter) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = DirectoryAdapter::new(dir.path().to_path_buf());
        adapter.initialize().unwrap();
        (dir, adapter)
    }

    #[test]
    fn test_initialize_creates_layout() {
        let (dir, adapter) = adapter();
        assert!(dir.path().join("input").is_dir());
        assert!(dir.path().join("output").is_dir());

        let readme = fs::read_to_string(dir.path().join("input").join(README_NAME)).unwrap();
        assert!(readme.starts_with("DMDC GPT Linux Input Directory"));

        // Second initialize leaves an edited README alone
        fs::write(dir.path().join("input").join(README_NAME), "mine").unwrap();
        adapter.initialize().unwrap();
        let readme = fs::read_to_string(dir.path().join("input").join(README_NAME)).unwrap();
        assert_eq!(readme, "mine");
    }

    #[test]
    fn test_poll_consumes_files_in_name_order() {
        let (_dir, adapter) = adapter();
        fs::write(adapter.input_dir().join("b.txt"), "second").unwrap();
        fs::write(adapter.input_dir().join("a.txt"), "first").unwrap();
        fs::write(adapter.input_dir().join("notes.md"), "ignored").unwrap();

        assert_eq!(adapter.poll().unwrap().as_deref(), Some("first"));
        assert_eq!(adapter.poll().unwrap().as_deref(), Some("second"));
        assert_eq!(adapter.poll().unwrap(), None);

        assert!(adapter.input_dir().join("processed_a.txt").exists());
        assert!(adapter.input_dir().join("processed_b.txt").exists());
        assert!(!adapter.input_dir().join("a.txt").exists());
    }

    #[test]
    fn test_readme_and_consumed_files_are_skipped() {
        let (_dir, adapter) = adapter();
        fs::write(adapter.input_dir().join("processed_old.txt"), "old").unwrap();

        assert_eq!(adapter.poll().unwrap(), None);
    }

    #[test]
    fn test_consumed_files_survive_restart() {
        let (dir, adapter) = adapter();
        fs::write(adapter.input_dir().join("req.txt"), "once").unwrap();
        assert_eq!(adapter.poll().unwrap().as_deref(), Some("once"));

        let restarted = DirectoryAdapter::new(dir.path().to_path_buf());
        restarted.initialize().unwrap();
        assert_eq!(restarted.poll().unwrap(), None);
    }

    #[test]
    fn test_poll_without_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = DirectoryAdapter::new(dir.path().join("missing"));
        assert_eq!(adapter.poll().unwrap(), None);
    }

    #[test]
    fn test_shutdown_stops_consuming() {
        let (_dir, adapter) = adapter();
        fs::write(adapter.input_dir().join("late.txt"), "late").unwrap();

        adapter.shutdown().unwrap();
        assert_eq!(adapter.poll().unwrap(), None);
        adapter.write("dropped").unwrap();

        assert!(adapter.input_dir().join("late.txt").exists());
        assert_eq!(fs::read_dir(adapter.output_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_never_overwrites() {
        let (_dir, adapter) = adapter();
        adapter.write("one").unwrap();
        adapter.write("two").unwrap();
        adapter.write("three").unwrap();

        let mut contents: Vec<String> = fs::read_dir(adapter.output_dir())
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path();
                let name = path.file_name().unwrap().to_str().unwrap().to_string();
                assert!(name.starts_with("output_") && name.ends_with(".txt"), "{}", name);
                fs::read_to_string(path).unwrap()
            })
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["one", "three", "two"]);
    }
}
