//! File watcher for the open document.
//!
//! Watches the document's parent directory (editors often save by writing a
//! temp file and renaming it over the original, which a watch on the file
//! itself would lose) and reports changes to the document only.

use crate::error::{Error, Result};
use log::debug;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// File events the previewer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The document was written or re-created
    Changed,
    /// The document was deleted or moved away
    Removed,
    /// The watcher encountered an error
    Error(String),
}

/// Watches a single markdown file for changes.
#[derive(Debug)]
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<FileEvent>,
    path: PathBuf,
}

impl FileWatcher {
    /// Start watching `path`.
    pub fn new(path: &Path) -> Result<Self> {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (tx, rx) = channel();
        let watch_target = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                Self::handle_event(result, &watch_target, &tx);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )
        .map_err(|e| Error::Watch {
            path: target.clone(),
            message: e.to_string(),
        })?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch {
                path: target.clone(),
                message: e.to_string(),
            })?;
        debug!("Watching {}", target.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            path: target,
        })
    }

    /// The watched document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle_event(
        result: std::result::Result<Event, notify::Error>,
        target: &Path,
        tx: &Sender<FileEvent>,
    ) {
        match result {
            Ok(event) => {
                if !event.paths.iter().any(|p| is_same_file(p, target)) {
                    return;
                }
                if let Some(file_event) = classify(&event.kind) {
                    let _ = tx.send(file_event);
                }
            }
            Err(e) => {
                let _ = tx.send(FileEvent::Error(e.to_string()));
            }
        }
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        coalesce(events)
    }
}

/// Map a raw notify event kind onto a document event.
pub fn classify(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Changed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FileEvent::Removed),
        EventKind::Modify(_) => Some(FileEvent::Changed),
        EventKind::Remove(_) => Some(FileEvent::Removed),
        _ => None,
    }
}

fn is_same_file(candidate: &Path, target: &Path) -> bool {
    if candidate == target {
        return true;
    }
    // Events may report a path that differs only by symlinks in the parent
    candidate.file_name() == target.file_name()
        && candidate
            .parent()
            .and_then(|p| p.canonicalize().ok())
            .zip(target.parent().map(Path::to_path_buf))
            .map(|(a, b)| a == b)
            .unwrap_or(false)
}

/// Collapse runs of identical consecutive events.
pub fn coalesce(events: Vec<FileEvent>) -> Vec<FileEvent> {
    let mut out: Vec<FileEvent> = Vec::with_capacity(events.len());
    for event in events {
        if out.last() != Some(&event) {
            out.push(event);
        }
    }
    out
}
