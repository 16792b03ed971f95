//! Shared settings snapshot with explicit and file-watch driven reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;

use crate::app::snapshot::Snapshot;
use crate::infra::settings::{EnvOverrides, Settings};

/// Quiet period after the last file event before settings are re-read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

struct HandleInner {
    path: PathBuf,
    env: EnvOverrides,
    current: RwLock<Arc<Snapshot>>,
}

/// Cheap-to-clone handle to the current [`Snapshot`].
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for SettingsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsHandle")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl SettingsHandle {
    /// Load settings from `path`, falling back to the defaults when the file does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with_env(path, EnvOverrides::from_env())
    }

    pub fn load_with_env(path: impl Into<PathBuf>, env: EnvOverrides) -> Result<Self> {
        let path = path.into();
        let settings = Settings::load_with_layers(Some(&path), env.clone())?;
        let snapshot = Arc::new(Snapshot::compile(&settings));
        Ok(Self {
            inner: Arc::new(HandleInner {
                path,
                env,
                current: RwLock::new(snapshot),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.current.read())
    }

    /// Re-read the settings file and swap in a new snapshot.
    ///
    /// On failure the previous snapshot stays current.
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        match self.read_snapshot() {
            Ok(snapshot) => {
                *self.inner.current.write() = Arc::clone(&snapshot);
                tracing::info!(
                    path = %self.inner.path.display(),
                    diagnostics = snapshot.diagnostics().len(),
                    "settings reloaded"
                );
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.inner.path.display(),
                    error = %format!("{err:#}"),
                    "settings reload failed, keeping previous snapshot"
                );
                Err(err)
            }
        }
    }

    fn read_snapshot(&self) -> Result<Arc<Snapshot>> {
        let path = &self.inner.path;
        if !path.exists() {
            bail!("settings file not found: {}", path.display());
        }
        let settings = Settings::load_with_layers(Some(path), self.inner.env.clone())?;
        Ok(Arc::new(Snapshot::compile(&settings)))
    }
}

enum Signal {
    Changed,
    Stop,
}

/// Background watcher that reloads a [`SettingsHandle`] when its file changes.
///
/// Dropping the watcher stops the worker thread.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    signals: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl SettingsWatcher {
    pub fn spawn<F>(handle: SettingsHandle, debounce: Duration, mut on_reload: F) -> Result<Self>
    where
        F: FnMut(Arc<Snapshot>) + Send + 'static,
    {
        let path = handle.path().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .map(ToOwned::to_owned)
            .with_context(|| format!("settings path has no file name: {}", path.display()))?;
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let (signals, receiver) = mpsc::channel();
        let events = signals.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    let _ = events.send(Signal::Changed);
                }
            }
            Err(err) => tracing::warn!(error = %err, "settings watcher error"),
        })
        .map_err(|err| anyhow!("failed to create settings watcher: {err}"))?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", directory.display()))?;
        tracing::debug!(directory = %directory.display(), "watching settings directory");

        let worker = thread::Builder::new()
            .name("settings-watcher".into())
            .spawn(move || {
                while let Ok(Signal::Changed) = receiver.recv() {
                    loop {
                        match receiver.recv_timeout(debounce) {
                            Ok(Signal::Changed) => continue,
                            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                            Err(RecvTimeoutError::Timeout) => break,
                        }
                    }
                    if let Ok(snapshot) = handle.reload() {
                        on_reload(snapshot);
                    }
                }
            })
            .context("failed to spawn settings watcher thread")?;

        Ok(Self {
            _watcher: watcher,
            signals,
            worker: Some(worker),
        })
    }
}

impl Drop for SettingsWatcher {
    fn drop(&mut self) {
        let _ = self.signals.send(Signal::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn touches_file(event: &Event, file_name: &OsString) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}
