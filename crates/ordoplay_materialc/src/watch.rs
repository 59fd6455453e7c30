// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounced watching of the pipeline's input files.
//!
//! Editors usually save by writing a temporary file and renaming it over
//! the old one, so the parent directory is watched and events are
//! filtered down to the files of interest.

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Watched files were created, modified or removed
    Changed(Vec<PathBuf>),
    /// The backend reported an error
    Error(String),
}

/// Files of interest and the directories holding them
#[derive(Debug, Default)]
pub struct WatchSet {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl WatchSet {
    /// Track a file. Returns its directory if that directory is new.
    pub fn insert(&mut self, path: &Path) -> Option<PathBuf> {
        let path = normalize(path);
        let dir = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        self.files.insert(path);
        self.dirs.insert(dir.clone()).then_some(dir)
    }

    /// Whether an event path refers to a tracked file
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(&normalize(path))
    }

    /// Number of tracked files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    // Removed files no longer canonicalize; resolve the directory instead
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => std::fs::canonicalize(dir)
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Watcher over the pipeline's input files
pub struct PipelineWatcher {
    /// The underlying debounced watcher
    watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    /// Receiver for filtered events
    event_rx: Receiver<WatchEvent>,
    /// Shared with the debouncer callback
    watched: Arc<RwLock<WatchSet>>,
}

impl PipelineWatcher {
    /// Create a watcher with the given debounce window
    pub fn new(debounce: Duration) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let watched = Arc::new(RwLock::new(WatchSet::default()));
        let filter = Arc::clone(&watched);

        let watcher = new_debouncer(debounce, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                use notify::EventKind;
                let watched = filter.read();
                let mut changed: Vec<PathBuf> = Vec::new();
                for event in events {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        continue;
                    }
                    for path in &event.paths {
                        if watched.contains(path) && !changed.contains(path) {
                            changed.push(path.clone());
                        }
                    }
                }
                if !changed.is_empty() {
                    let _ = event_tx.send(WatchEvent::Changed(changed));
                }
            }
            Err(errors) => {
                for error in errors {
                    let _ = event_tx.send(WatchEvent::Error(error.to_string()));
                }
            }
        })?;

        Ok(Self {
            watcher,
            event_rx,
            watched,
        })
    }

    /// Watch a file, and its directory if not watched yet
    pub fn watch_file(&mut self, path: &Path) -> Result<(), notify::Error> {
        let new_dir = self.watched.write().insert(path);
        if let Some(dir) = new_dir {
            self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::info!("Watching directory for changes: {:?}", dir);
        }
        Ok(())
    }

    /// Number of watched files
    pub fn watched_file_count(&self) -> usize {
        self.watched.read().file_count()
    }

    /// Block until an event arrives or the timeout elapses
    pub fn wait(&self, timeout: Duration) -> Option<WatchEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("File watcher channel disconnected");
                None
            }
        }
    }
}
