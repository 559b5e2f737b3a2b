// fridactl-core/src/pipeline/worker.rs
//! The start and stop sequences. Steps run strictly in order; the first
//! failing step ends the operation with exactly one ERROR event.
use std::fs;
use std::path::{Path, PathBuf};

use fridactl_common::cache::ArtifactCache;
use fridactl_common::error::{FridaError, Result};
use fridactl_common::model::{ArtifactFormat, ArtifactKey};
use fridactl_common::status::StatusSender;
use tracing::{debug, instrument, warn};

use crate::install::{decompress_xz, stage};
use crate::manager::{ProgressObserver, Shared, StartOutcome, StopOutcome};
use crate::platform;
use crate::process::shell::ElevatedShell;
use crate::process::supervisor::{self, KillOutcome};

#[instrument(skip_all, fields(version = %version))]
pub(crate) async fn execute_start<S: ElevatedShell>(
    shared: &Shared<S>,
    progress: &dyn ProgressObserver,
    version: &str,
    sink: &StatusSender,
) -> StartOutcome {
    let (os, arch) = platform::identify(&shared.config);
    let key = match ArtifactKey::new(version, os, arch) {
        Ok(key) => key,
        Err(e) => {
            sink.error(format!("Invalid request: {e}"));
            return StartOutcome::Aborted;
        }
    };
    sink.info(format!("Target: {}", key.file_name()));

    let staged_path = match ensure_staged(shared, progress, &key, sink).await {
        Ok(path) => path,
        Err(e) => {
            sink.error(format!("Failed to prepare {}: {}", key.file_name(), e));
            return StartOutcome::Aborted;
        }
    };

    let process_name = shared.config.process_name.as_str();
    let launched = match supervisor::launch(&shared.shell, &staged_path, process_name).await {
        Ok(process) => process,
        Err(e) => {
            sink.error(format!("Failed to launch {}: {}", staged_path.display(), e));
            return StartOutcome::Aborted;
        }
    };
    sink.success(format!("Launched {}", staged_path.display()));
    shared.track(Some(launched));

    match supervisor::confirm_running(
        &shared.shell,
        process_name,
        shared.config.confirm_attempts,
        shared.config.confirm_interval,
    )
    .await
    {
        Ok(lines) => {
            for line in &lines {
                sink.process_info(line.as_str());
            }
            shared.update_tracked(|process| process.mark_confirmed(&lines));
            StartOutcome::Launched { confirmed: true }
        }
        Err(e) => {
            sink.failure("Could not confirm the server is running", &e);
            StartOutcome::Launched { confirmed: false }
        }
    }
}

/// Produces the staged binary for `key`, reusing whatever stage already
/// exists on disk.
async fn ensure_staged<S: ElevatedShell>(
    shared: &Shared<S>,
    progress: &dyn ProgressObserver,
    key: &ArtifactKey,
    sink: &StatusSender,
) -> Result<PathBuf> {
    let location = shared.cache.locate(key);
    if ArtifactCache::exists(&location.staged_path) {
        sink.info(format!(
            "{} is already staged, skipping download",
            location.staged_path.display()
        ));
        return Ok(location.staged_path);
    }

    // Held until the cached binary is complete. A start that overlaps a live
    // download fails here rather than reading that download's files.
    let permit = shared.downloader.try_acquire()?;
    let location = shared.cache.prepare(key)?;
    let format = shared.cache.format();
    if ArtifactCache::exists(&location.decompressed_path) {
        sink.info(format!("Using cached {}", location.decompressed_path.display()));
    } else {
        if format == ArtifactFormat::Xz && ArtifactCache::exists(&location.compressed_path) {
            sink.info(format!(
                "Reusing downloaded archive {}",
                location.compressed_path.display()
            ));
        } else {
            sink.info(format!("Downloading {}", shared.downloader.url_for(key)));
            let bytes = shared
                .downloader
                .download_with(&permit, key, &location.compressed_path, |p| {
                    progress.on_progress(p)
                })
                .await?;
            sink.success(format!(
                "Downloaded {} ({} bytes)",
                key.asset_name(format),
                bytes
            ));
        }

        if format == ArtifactFormat::Xz {
            // The archive is complete but unusable either way; the next start
            // downloads it again.
            if let Err(e) =
                decompress(&location.compressed_path, &location.decompressed_path).await
            {
                remove_archive(&location.compressed_path);
                return Err(e);
            }
            sink.success(format!(
                "Decompressed to {}",
                location.decompressed_path.display()
            ));
            remove_archive(&location.compressed_path);
        }
    }
    drop(permit);

    stage(&shared.shell, &location.decompressed_path, &location.staged_path).await?;
    sink.success(format!("Staged {}", location.staged_path.display()));
    Ok(location.staged_path)
}

fn remove_archive(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove archive {}: {}", path.display(), e);
    }
}

async fn decompress(compressed: &Path, out: &Path) -> Result<u64> {
    let compressed = compressed.to_path_buf();
    let out = out.to_path_buf();
    tokio::task::spawn_blocking(move || decompress_xz(&compressed, &out))
        .await
        .map_err(|e| FridaError::IoError(format!("Decompression task failed: {e}")))?
}

#[instrument(skip_all)]
pub(crate) async fn execute_stop<S: ElevatedShell>(
    shared: &Shared<S>,
    sink: &StatusSender,
) -> StopOutcome {
    let tracked = shared.tracked_process();
    let name = tracked
        .as_ref()
        .map(|p| p.process_name.clone())
        .unwrap_or_else(|| shared.config.process_name.clone());
    debug!("Stopping '{}' (tracked: {})", name, tracked.is_some());

    match supervisor::stop(&shared.shell, &name).await {
        Ok(KillOutcome::Killed) => {
            shared.track(None);
            sink.success(format!("Stopped {name}"));
            StopOutcome::Stopped
        }
        Ok(KillOutcome::NonZero { exit_code, stderr }) => {
            shared.track(None);
            let mut message = if tracked.is_none() {
                format!("Nothing to stop: no running {name} found")
            } else {
                let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                format!("pkill exited with {code}; {name} may have already exited")
            };
            if !stderr.is_empty() {
                message.push_str(&format!(" ({stderr})"));
            }
            sink.warning(message);
            StopOutcome::NothingToStop
        }
        Err(e) if tracked.is_none() => {
            sink.warning(format!("Nothing to stop: {e}"));
            StopOutcome::NothingToStop
        }
        Err(e) => {
            sink.error(format!("Failed to stop {name}: {e}"));
            StopOutcome::Failed
        }
    }
}
