//! Line history persisted to a plain text file.
//!
//! The file holds one entry per line. Accepted lines are appended as they
//! are entered, so history survives a crash. If the file cannot be opened
//! the history still works for the current run.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default number of entries kept in memory.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Previously entered lines, oldest first.
#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    file: Option<File>,
    capacity: usize,
}

impl History {
    /// History that is not persisted.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            file: None,
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// `<user cache dir>/ntsh/history`, if the platform has a cache dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("ntsh").join("history"))
    }

    /// Load history from `path` and append new entries to it.
    ///
    /// Falls back to in-memory history, with a warning, if the file or its
    /// directory cannot be created.
    pub fn open(path: &Path) -> Self {
        match Self::try_open(path) {
            Ok(history) => {
                tracing::debug!(path = %path.display(), entries = history.len(), "loaded history");
                history
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "history not persisted: {}", e);
                Self::in_memory()
            }
        }
    }

    fn try_open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut history = Self::in_memory();
        history.entries = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        history.trim();
        history.file = Some(file);
        Ok(history)
    }

    /// Set the maximum number of entries kept in memory.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self.trim();
        self
    }

    /// Record an accepted line.
    ///
    /// Empty lines and repeats of the previous entry are not recorded.
    pub fn push(&mut self, line: &str) {
        if line.is_empty() || self.entries.last().map(String::as_str) == Some(line) {
            return;
        }
        self.entries.push(line.to_string());
        self.trim();

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line) {
                tracing::warn!("failed to append to history, keeping it in memory: {}", e);
                self.file = None;
            }
        }
    }

    fn trim(&mut self) {
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if entries are appended to a file.
    pub fn is_persistent(&self) -> bool {
        self.file.is_some()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::in_memory()
    }
}
