// fridactl-common/src/model/artifact.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::platform::{ArchTag, OsTag};
use crate::error::{FridaError, Result};

pub const ARTIFACT_PREFIX: &str = "frida-server";

/// How the release asset is packaged on the release host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// `.xz` compressed asset, decompressed into the cache after download.
    #[default]
    Xz,
    /// Uncompressed asset, downloaded straight to the decompressed slot.
    Raw,
}

impl ArtifactFormat {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ArtifactFormat::Xz => Some("xz"),
            ArtifactFormat::Raw => None,
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xz" => Ok(ArtifactFormat::Xz),
            "raw" | "none" => Ok(ArtifactFormat::Raw),
            other => Err(FridaError::Config(format!(
                "Unsupported artifact format '{other}' (expected 'xz' or 'raw')"
            ))),
        }
    }
}

/// Identifies one frida-server build. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    version: String,
    os: OsTag,
    arch: ArchTag,
}

impl ArtifactKey {
    /// The version ends up inside `su -c` command lines, so it is restricted to
    /// characters that carry no meaning to a shell.
    pub fn new(version: impl Into<String>, os: OsTag, arch: ArchTag) -> Result<Self> {
        let version = version.into();
        let version = version.trim().to_string();
        if version.is_empty() {
            return Err(FridaError::Config("Version must not be empty".to_string()));
        }
        if let Some(bad) = version
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')))
        {
            return Err(FridaError::Config(format!(
                "Invalid character '{bad}' in version '{version}'"
            )));
        }
        // The version is also a cache directory name; `.` and `..` would
        // escape it.
        if version.starts_with('.') {
            return Err(FridaError::Config(format!(
                "Version '{version}' must not start with '.'"
            )));
        }
        Ok(Self { version, os, arch })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn os(&self) -> OsTag {
        self.os
    }

    pub fn arch(&self) -> ArchTag {
        self.arch
    }

    /// `frida-server-<version>-<os>-<arch>`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            ARTIFACT_PREFIX, self.version, self.os, self.arch
        )
    }

    /// Name of the asset as published, including the format's extension.
    pub fn asset_name(&self, format: ArtifactFormat) -> String {
        match format.extension() {
            Some(ext) => format!("{}.{}", self.file_name(), ext),
            None => self.file_name(),
        }
    }

    pub fn download_url(&self, release_base_url: &str, format: ArtifactFormat) -> String {
        format!(
            "{}/{}/{}",
            release_base_url.trim_end_matches('/'),
            self.version,
            self.asset_name(format)
        )
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// The three stages an artifact moves through: remote -> compressed cache ->
/// decompressed cache -> staged privileged copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub compressed_path: PathBuf,
    pub decompressed_path: PathBuf,
    pub staged_path: PathBuf,
}
