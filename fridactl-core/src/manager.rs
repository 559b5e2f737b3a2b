// fridactl-core/src/manager.rs
//! Public entry point: start and stop the server, each on its own worker.
use std::sync::{Arc, Mutex, MutexGuard};

use fridactl_common::cache::ArtifactCache;
use fridactl_common::config::Config;
use fridactl_common::error::{FridaError, Result};
use fridactl_common::model::{ArtifactKey, ArtifactLocation};
use fridactl_common::status::StatusSender;
use fridactl_net::{DownloadProgress, Downloader};
use tracing::{instrument, trace};

use crate::pipeline::engine::{spawn_worker, OperationHandle};
use crate::pipeline::worker;
use crate::platform;
use crate::process::shell::{ElevatedShell, SuShell};
use crate::process::supervisor::{self, SupervisedProcess};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The binary was launched. `confirmed` is false when it never showed up
    /// in the process table within the polling window.
    Launched { confirmed: bool },
    /// A step failed before launch; the ERROR event says which.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NothingToStop,
    Failed,
}

/// Receives download progress on the worker thread.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: DownloadProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: DownloadProgress) {
        self(progress)
    }
}

pub(crate) struct Shared<S> {
    pub(crate) config: Config,
    pub(crate) cache: ArtifactCache,
    pub(crate) downloader: Downloader,
    pub(crate) shell: S,
    tracked: Mutex<Option<SupervisedProcess>>,
}

impl<S> Shared<S> {
    fn lock_tracked(&self) -> MutexGuard<'_, Option<SupervisedProcess>> {
        // A poisoned lock still holds a usable record.
        self.tracked.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn tracked_process(&self) -> Option<SupervisedProcess> {
        self.lock_tracked().clone()
    }

    pub(crate) fn track(&self, process: Option<SupervisedProcess>) {
        *self.lock_tracked() = process;
    }

    pub(crate) fn update_tracked(&self, f: impl FnOnce(&mut SupervisedProcess)) {
        if let Some(process) = self.lock_tracked().as_mut() {
            f(process);
        }
    }
}

/// Downloads, stages, launches and stops frida-server.
///
/// Cloning is cheap and clones share everything, including the download
/// slot and the tracked process.
pub struct FridaManager<S: ElevatedShell = SuShell> {
    shared: Arc<Shared<S>>,
    progress: Arc<dyn ProgressObserver>,
}

impl<S: ElevatedShell> Clone for FridaManager<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            progress: Arc::clone(&self.progress),
        }
    }
}

impl FridaManager<SuShell> {
    pub fn new(config: Config) -> Result<Self> {
        let shell = SuShell::from_config(&config);
        Self::with_shell(config, shell)
    }
}

impl<S: ElevatedShell> FridaManager<S> {
    pub fn with_shell(config: Config, shell: S) -> Result<Self> {
        let downloader = Downloader::new(&config)?;
        let cache = ArtifactCache::new(&config);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                cache,
                downloader,
                shell,
                tracked: Mutex::new(None),
            }),
            progress: Arc::new(|p: DownloadProgress| trace!("Download progress: {:?}", p)),
        })
    }

    pub fn with_progress_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.progress = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.shared.cache
    }

    pub fn downloader(&self) -> &Downloader {
        &self.shared.downloader
    }

    pub fn tracked_process(&self) -> Option<SupervisedProcess> {
        self.shared.tracked_process()
    }

    /// Key, paths and URL a `start(version)` would use. Touches nothing.
    pub fn describe(&self, version: &str) -> Result<(ArtifactKey, ArtifactLocation, String)> {
        let (os, arch) = platform::identify(&self.shared.config);
        let key = ArtifactKey::new(version, os, arch)?;
        let location = self.shared.cache.locate(&key);
        let url = self.shared.downloader.url_for(&key);
        Ok((key, location, url))
    }

    /// Ensures `version` is downloaded, staged and running. Returns at once;
    /// progress arrives on `sink` and the outcome through the handle.
    #[instrument(skip(self, sink))]
    pub fn start(&self, version: &str, sink: StatusSender) -> OperationHandle<StartOutcome> {
        let shared = Arc::clone(&self.shared);
        let progress = Arc::clone(&self.progress);
        let version = version.to_string();
        let fallback_sink = sink.clone();
        spawn_worker(
            "fridactl-start",
            move |e| {
                fallback_sink.error(format!("Failed to start worker: {e}"));
                StartOutcome::Aborted
            },
            move || async move {
                worker::execute_start(&shared, progress.as_ref(), &version, &sink).await
            },
        )
    }

    /// Kills the server by name. Does not wait for or cancel a running start.
    #[instrument(skip(self, sink))]
    pub fn stop(&self, sink: StatusSender) -> OperationHandle<StopOutcome> {
        let shared = Arc::clone(&self.shared);
        let fallback_sink = sink.clone();
        spawn_worker(
            "fridactl-stop",
            move |e| {
                fallback_sink.error(format!("Failed to start worker: {e}"));
                StopOutcome::Failed
            },
            move || async move { worker::execute_stop(&shared, &sink).await },
        )
    }

    /// One look at the process table for the configured process name.
    /// Blocks the calling thread for at most one elevated command.
    pub fn query(&self) -> Result<Vec<String>> {
        let shared = Arc::clone(&self.shared);
        let handle = spawn_worker(
            "fridactl-query",
            |e| Err(e),
            move || async move { supervisor::query(&shared.shell, &shared.config.process_name).await },
        );
        handle
            .join()
            .map_err(|msg| FridaError::Generic(format!("Query worker panicked: {msg}")))?
    }
}
