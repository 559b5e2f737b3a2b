// fridactl-common/src/cache.rs
// Maps artifact keys to on-disk locations in the private cache and the
// privileged staging directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{FridaError, Result};
use crate::model::{ArtifactFormat, ArtifactKey, ArtifactLocation};
use crate::Config;

/// Artifact cache rooted at `<home>/frida`. Nothing is ever evicted; cached
/// builds stay until removed with `clear_version` / `clear_all`.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    cache_dir: PathBuf,
    staging_dir: PathBuf,
    format: ArtifactFormat,
}

impl ArtifactCache {
    pub fn new(config: &Config) -> Self {
        Self {
            cache_dir: config.cache_dir(),
            staging_dir: config.staging_dir().to_path_buf(),
            format: config.format,
        }
    }

    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    /// `<cache>/<version>/<os>/<arch>`
    pub fn artifact_dir(&self, key: &ArtifactKey) -> PathBuf {
        self.cache_dir
            .join(key.version())
            .join(key.os().as_str())
            .join(key.arch().as_str())
    }

    /// Pure path computation; touches nothing on disk.
    pub fn locate(&self, key: &ArtifactKey) -> ArtifactLocation {
        let dir = self.artifact_dir(key);
        let decompressed_path = dir.join(key.file_name());
        let compressed_path = dir.join(key.asset_name(self.format));
        ArtifactLocation {
            compressed_path,
            decompressed_path,
            staged_path: self.staging_dir.join(key.file_name()),
        }
    }

    /// Like `locate`, but also creates the per-key cache directory.
    pub fn prepare(&self, key: &ArtifactKey) -> Result<ArtifactLocation> {
        let dir = self.artifact_dir(key);
        fs::create_dir_all(&dir).map_err(|e| {
            FridaError::IoError(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(self.locate(key))
    }

    /// A stage counts as present only when it is a regular, non-empty file.
    /// Interrupted downloads or decompressions leave zero-length or missing
    /// files behind, and those must be produced again.
    pub fn exists(path: &Path) -> bool {
        fs::metadata(path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Hidden sibling that a stage is written to before being renamed into
    /// place: `<dir>/.<name>.download`. Never satisfies `exists` for the
    /// final path, whatever state it is left in.
    pub fn partial_path(path: &Path) -> PathBuf {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        path.with_file_name(format!(".{name}.download"))
    }

    /// Removes every cached build of `version`. Returns whether anything was removed.
    pub fn clear_version(&self, version: &str) -> Result<bool> {
        if version.is_empty() || version.contains(['/', '\\']) || version.starts_with('.') {
            return Err(FridaError::Validation(format!(
                "Refusing to clear cache for version '{version}'"
            )));
        }
        let dir = self.cache_dir.join(version);
        if !dir.exists() {
            return Ok(false);
        }
        tracing::debug!("Clearing cached artifacts in {}", dir.display());
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    /// Clears all cached artifacts. The staging directory is never touched.
    pub fn clear_all(&self) -> Result<()> {
        if self.cache_dir.exists() {
            tracing::debug!("Clearing artifact cache {}", self.cache_dir.display());
            fs::remove_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}
