//! Collaborators of the dashboard-style display surface.
//!
//! Nothing in here is used by the classifier. A display surface keeps a single
//! shared "hide balances" flag that several processes (the app and its
//! widgets) read and toggle, and re-renders on a fixed schedule or when asked
//! to refresh.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum DisplayStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt display state: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Display state lock poisoned")]
    Poisoned,
}

/// Shared visibility state of a display surface.
pub trait DisplayStore: Send + Sync {
    /// `true` when balances are hidden.
    fn visibility_flag(&self) -> Result<bool, DisplayStoreError>;

    fn set_visibility_flag(&self, hidden: bool) -> Result<(), DisplayStoreError>;

    /// Flips the flag and returns the new value.
    fn toggle_visibility(&self) -> Result<bool, DisplayStoreError> {
        let hidden = !self.visibility_flag()?;
        self.set_visibility_flag(hidden)?;
        Ok(hidden)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DisplayState {
    #[serde(default)]
    balances_hidden: bool,
}

/// Display state persisted as a small JSON file, typically inside a directory
/// shared between an app and its widgets. Writes go through a temporary file
/// and a rename so readers in other processes never see a partial file.
#[derive(Debug, Clone)]
pub struct FileDisplayStore {
    path: PathBuf,
}

impl FileDisplayStore {
    pub const FILE_NAME: &'static str = "display_state.json";

    /// Store backed by `display_state.json` inside `shared_dir`.
    pub fn new(shared_dir: impl AsRef<Path>) -> Result<Self, DisplayStoreError> {
        let dir = shared_dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self { path: dir.join(Self::FILE_NAME) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> Result<DisplayState, DisplayStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DisplayState::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl DisplayStore for FileDisplayStore {
    fn visibility_flag(&self) -> Result<bool, DisplayStoreError> {
        Ok(self.read_state()?.balances_hidden)
    }

    fn set_visibility_flag(&self, hidden: bool) -> Result<(), DisplayStoreError> {
        let state = DisplayState { balances_hidden: hidden };
        // One temp file per write: concurrent writers must never rename each other's file.
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        fs::write(&tmp, serde_json::to_vec(&state)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!("Display visibility set to hidden={} in {:?}", hidden, self.path);
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryDisplayStore {
    hidden: Mutex<bool>,
}

impl DisplayStore for MemoryDisplayStore {
    fn visibility_flag(&self) -> Result<bool, DisplayStoreError> {
        self.hidden.lock().map(|h| *h).map_err(|_| DisplayStoreError::Poisoned)
    }

    fn set_visibility_flag(&self, hidden: bool) -> Result<(), DisplayStoreError> {
        *self.hidden.lock().map_err(|_| DisplayStoreError::Poisoned)? = hidden;
        Ok(())
    }

    fn toggle_visibility(&self) -> Result<bool, DisplayStoreError> {
        let mut guard = self.hidden.lock().map_err(|_| DisplayStoreError::Poisoned)?;
        *guard = !*guard;
        Ok(*guard)
    }
}

/// One rendering of the display surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub rendered_at: DateTime<Utc>,
    pub hidden: bool,
}

/// Requests an immediate re-render of a running [`Timeline`].
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    notify: Arc<Notify>,
}

impl RefreshHandle {
    pub fn refresh(&self) {
        self.notify.notify_one();
    }
}

/// Re-renders a display surface every `interval`, or sooner when refreshed.
pub struct Timeline<S: DisplayStore> {
    store: Arc<S>,
    interval: Duration,
    notify: Arc<Notify>,
}

impl<S: DisplayStore + 'static> Timeline<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_interval(store, DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_interval(store: Arc<S>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle { notify: Arc::clone(&self.notify) }
    }

    /// Renders the current state once.
    pub fn snapshot(&self) -> Result<TimelineEntry, DisplayStoreError> {
        Ok(TimelineEntry {
            rendered_at: Utc::now(),
            hidden: self.store.visibility_flag()?,
        })
    }

    /// When the entry rendered at `from` should be replaced.
    pub fn next_update(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let step = chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::hours(1));
        from + step
    }

    /// Renders immediately, then on every tick or refresh signal, handing each
    /// entry to `render`. Returns once `shutdown` is set to `true` or its sender
    /// is dropped.
    pub async fn run<F>(self, mut render: F, mut shutdown: watch::Receiver<bool>) -> Result<(), DisplayStoreError>
    where
        F: FnMut(TimelineEntry) + Send,
    {
        info!("Display timeline started (interval {:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.notify.notified() => {
                    debug!("Display refresh requested");
                    ticker.reset();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Display timeline stopped");
                        return Ok(());
                    }
                    continue;
                }
            }
            render(self.snapshot()?);
        }
    }
}
