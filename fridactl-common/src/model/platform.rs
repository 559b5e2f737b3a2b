// fridactl-common/src/model/platform.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FridaError, Result};

/// Operating-system tag as used in frida release asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsTag {
    Android,
    Linux,
    Windows,
    Darwin,
    Unknown,
}

impl OsTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsTag::Android => "android",
            OsTag::Linux => "linux",
            OsTag::Windows => "windows",
            OsTag::Darwin => "darwin",
            OsTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OsTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsTag {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(OsTag::Android),
            "linux" => Ok(OsTag::Linux),
            "windows" => Ok(OsTag::Windows),
            "darwin" | "macos" => Ok(OsTag::Darwin),
            "unknown" => Ok(OsTag::Unknown),
            other => Err(FridaError::Config(format!("Unrecognized OS tag '{other}'"))),
        }
    }
}

/// CPU-architecture tag as used in frida release asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchTag {
    Arm64,
    Arm,
    X86_64,
    X86,
}

impl ArchTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchTag::Arm64 => "arm64",
            ArchTag::Arm => "arm",
            ArchTag::X86_64 => "x86_64",
            ArchTag::X86 => "x86",
        }
    }
}

impl fmt::Display for ArchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchTag {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(ArchTag::Arm64),
            "arm" => Ok(ArchTag::Arm),
            "x86_64" | "amd64" => Ok(ArchTag::X86_64),
            "x86" => Ok(ArchTag::X86),
            other => Err(FridaError::Config(format!(
                "Unrecognized architecture tag '{other}'"
            ))),
        }
    }
}
