//! Operation queues keyed by target path

use std::path::{Path, PathBuf};

/// A queued filesystem or network operation
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedOperation<T> {
    pub target_path: PathBuf,
    pub extra: T,
}

/// Source of a queued download
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub url: String,
    pub thumbnail: Option<PathBuf>,
}

/// Source of a queued upload (a local file copied into the context)
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub source: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

/// Ordered queue that never holds two entries for the same target path
#[derive(Debug, Clone)]
pub struct OperationQueue<T> {
    entries: Vec<QueuedOperation<T>>,
}

impl<T> Default for OperationQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> OperationQueue<T> {
    /// Appends an operation unless its target path is already queued
    ///
    /// Returns true if the operation was added.
    pub fn push(&mut self, target_path: PathBuf, extra: T) -> bool {
        if self.contains(&target_path) {
            return false;
        }
        self.entries.push(QueuedOperation { target_path, extra });
        true
    }

    pub fn contains(&self, target_path: &Path) -> bool {
        self.entries.iter().any(|op| op.target_path == target_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every queued operation, leaving the queue empty
    pub fn drain(&mut self) -> Vec<QueuedOperation<T>> {
        std::mem::take(&mut self.entries)
    }
}
