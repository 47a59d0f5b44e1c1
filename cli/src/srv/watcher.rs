//! # devserve Change Watcher
//!
//! File: cli/src/srv/watcher.rs
//!
//! ## Overview
//!
//! Watches the serving directory recursively and calls back when something
//! changes, collapsing bursts of events (editor autosave, build output) into a
//! single call.
//!
//! ## Debouncing
//!
//! [`Debouncer`] is a two-state machine:
//! - `Idle`: the next event fires the callback immediately and starts a
//!   cooldown window (100 ms by default).
//! - `CoolingDown`: events are swallowed until the window has elapsed, after
//!   which the debouncer is `Idle` again.
//!
//! ## Failure
//!
//! A watcher error, or the watched root disappearing, is logged at error level
//! and ends the loop. The HTTP server keeps running without live reload.
//!
use crate::core::error::{DevserveError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Default cooldown between two callback invocations.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Observable state of a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    CoolingDown,
}

/// Leading-edge debouncer with a fixed cooldown window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    cooldown_until: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cooldown_until: None,
        }
    }

    pub fn state_at(&self, now: Instant) -> DebounceState {
        match self.cooldown_until {
            Some(until) if now < until => DebounceState::CoolingDown,
            _ => DebounceState::Idle,
        }
    }

    /// Records an event at `now`. Returns `true` if the callback should fire.
    pub fn trigger_at(&mut self, now: Instant) -> bool {
        match self.state_at(now) {
            DebounceState::CoolingDown => false,
            DebounceState::Idle => {
                self.cooldown_until = Some(now + self.window);
                true
            }
        }
    }
}

/// Keeps a running watch alive. Dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

#[cfg(test)]
impl WatchHandle {
    /// `true` once the watch loop has ended (failure or shutdown).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// # Change Watcher (`ChangeWatcher`)
///
/// Recursive directory watcher with a debounced callback.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    root: PathBuf,
    window: Duration,
}

impl ChangeWatcher {
    pub fn new(root: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            root: root.into(),
            window,
        }
    }

    /// # Start Watching (`spawn`)
    ///
    /// Registers a recursive watch on the root and spawns the event loop on the
    /// current Tokio runtime. `on_change` runs on that task.
    ///
    /// ## Errors
    ///
    /// Returns `DevserveError::Watch` if the platform watcher cannot be created
    /// or the root cannot be watched (missing, permission denied).
    pub fn spawn<F>(self, on_change: F) -> Result<WatchHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The loop may already be gone; nothing left to notify then.
            let _ = tx.send(res);
        })
        .map_err(DevserveError::from)?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(DevserveError::from)?;
        info!("Watching {} for changes", self.root.display());

        let task = tokio::spawn(run_loop(
            rx,
            self.root,
            Debouncer::new(self.window),
            on_change,
        ));

        Ok(WatchHandle {
            _watcher: watcher,
            task,
        })
    }
}

/// Consumes watcher events until the channel closes or the watch fails.
async fn run_loop<F>(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    root: PathBuf,
    mut debouncer: Debouncer,
    mut on_change: F,
) where
    F: FnMut() + Send + 'static,
{
    while let Some(result) = events.recv().await {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                error!("File watcher failed: {}", e);
                break;
            }
        };

        if matches!(event.kind, EventKind::Remove(_)) && root_is_gone(&root).await {
            error!(
                "Watched directory {} was removed; stopping file watcher",
                root.display()
            );
            break;
        }
        // Reads (including our own file serving) are not changes.
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }

        if debouncer.trigger_at(Instant::now()) {
            debug!("Change detected: {:?} {:?}", event.kind, event.paths);
            on_change();
        } else {
            trace!("Coalesced change event: {:?}", event.paths);
        }
    }
    warn!("Live reload is disabled for the rest of this session");
}

async fn root_is_gone(root: &Path) -> bool {
    !tokio::fs::try_exists(root).await.unwrap_or(false)
}
