use anyhow::Result;
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const REMOTE: &str = "origin";

/// Events emitted by the git watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitEvent {
    /// `HEAD` moved, e.g. a branch checkout.
    Checkout,
    /// The remote-tracking ref of the current branch changed, e.g. a pull.
    RemoteUpdated,
}

/// Branch name from the contents of `.git/HEAD`; `None` when detached.
pub fn current_branch(head: &str) -> Option<&str> {
    head.trim().strip_prefix("ref: refs/heads/")
}

/// Path of the remote-tracking ref of whatever branch `HEAD` names right now.
fn current_remote_ref(git_dir: &Path) -> Option<PathBuf> {
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let branch = current_branch(&head)?;
    Some(remotes_dir(git_dir).join(branch))
}

fn remotes_dir(git_dir: &Path) -> PathBuf {
    git_dir.join("refs").join("remotes").join(REMOTE)
}

/// Watches `.git/HEAD` and the current branch's remote ref.
///
/// The branch is looked up again for every change, so after a checkout
/// only the new branch's remote ref counts.
pub struct GitWatcher {
    git_dir: PathBuf,
}

/// Keeps the underlying watcher alive; dropping it stops the events.
pub struct GitWatch {
    _debouncer: Debouncer<RecommendedWatcher>,
    pub events: mpsc::Receiver<GitEvent>,
}

impl GitWatcher {
    pub fn new(git_dir: &Path) -> Self {
        Self {
            git_dir: git_dir.to_path_buf(),
        }
    }

    fn classify(git_dir: &Path, path: &Path) -> Option<GitEvent> {
        if path == git_dir.join("HEAD") {
            return Some(GitEvent::Checkout);
        }
        if path.starts_with(remotes_dir(git_dir))
            && current_remote_ref(git_dir).as_deref() == Some(path)
        {
            return Some(GitEvent::RemoteUpdated);
        }
        None
    }

    /// Start watching. The watcher runs on a background thread (via notify)
    /// and bridges to async via a tokio mpsc channel.
    pub fn watch(&self) -> Result<GitWatch> {
        let (tx, rx) = mpsc::channel(16);

        let git_dir = self.git_dir.clone();
        let mut debouncer = new_debouncer(
            Duration::from_millis(500),
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events.iter().filter(|e| e.kind == DebouncedEventKind::Any) {
                        if let Some(git_event) = Self::classify(&git_dir, &event.path) {
                            debug!(event = ?git_event, path = %event.path.display(), "git change detected");
                            let _ = tx.blocking_send(git_event);
                        }
                    }
                }
                Err(e) => {
                    warn!("git watcher error: {}", e);
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&self.git_dir, RecursiveMode::NonRecursive)?;
        let remotes = remotes_dir(&self.git_dir);
        if remotes.is_dir() {
            debouncer.watcher().watch(&remotes, RecursiveMode::Recursive)?;
        } else {
            debug!(dir = %remotes.display(), "no remote refs to watch");
        }

        Ok(GitWatch {
            _debouncer: debouncer,
            events: rx,
        })
    }
}
