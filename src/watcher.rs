use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::TriggerError;
use crate::events::{ChangeKind, FsChange};

/// Directory-mode event source: a notify watcher whose raw events are
/// mapped to `FsChange`s on a forwarding thread and consumed through a
/// channel by the session loop.
pub struct DirWatcher {
    watcher: RecommendedWatcher,
    event_rx: Receiver<FsChange>,
    target: PathBuf,
    recursive: bool,
}

impl DirWatcher {
    pub fn open(target: &Path, recursive: bool) -> Result<Self, TriggerError> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let (event_tx, event_rx) = mpsc::channel::<FsChange>();

        // Create the notify watcher
        let mut watcher = notify::recommended_watcher(tx)?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(target, mode)?;

        // Forward mapped events until either side hangs up
        thread::spawn(move || {
            while let Ok(result) = rx.recv() {
                match result {
                    Ok(event) => {
                        for change in map_event(event) {
                            if event_tx.send(change).is_err() {
                                return; // Receiver dropped, exit thread
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!("file watcher error: {}", err);
                    }
                }
            }
        });

        Ok(Self {
            watcher,
            event_rx,
            target: target.to_path_buf(),
            recursive,
        })
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<FsChange, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    /// Release the watch resource. Non-recursive registrations are removed
    /// explicitly; recursive ones release when the watcher drops.
    pub fn close(mut self) {
        if !self.recursive {
            if let Err(err) = self.watcher.unwatch(&self.target) {
                tracing::debug!("failed to remove watch on {}: {}", self.target.display(), err);
            }
        }
    }
}

/// Map one raw notify event to the enumerated categories a session
/// understands. Events outside the four categories are discarded here, at
/// the adapter, so the session loop never observes them.
fn map_event(event: Event) -> Vec<FsChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Access(AccessKind::Close(_)) => ChangeKind::Close,
        EventKind::Remove(_) => ChangeKind::Delete,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Move,
        _ => return Vec::new(),
    };

    let hint = event.kind;
    event
        .paths
        .into_iter()
        .map(|path| {
            let is_dir = match hint {
                EventKind::Create(CreateKind::Folder) => true,
                EventKind::Create(CreateKind::File) => false,
                EventKind::Remove(RemoveKind::Folder) => true,
                EventKind::Remove(RemoveKind::File) => false,
                // No kind hint: probe the path. A deleted or moved-away
                // path no longer exists and probes as a file event.
                _ => path.is_dir(),
            };
            FsChange::new(path, kind, is_dir)
        })
        .collect()
}
