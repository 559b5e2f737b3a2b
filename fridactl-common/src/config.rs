// fridactl-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use tracing::debug;

use super::error::{FridaError, Result};
use crate::model::{ArchTag, ArtifactFormat, OsTag};

pub const DEFAULT_RELEASE_BASE_URL: &str = "https://github.com/frida/frida/releases/download";
pub const DEFAULT_STAGING_DIR: &str = "/data/local/tmp";
pub const DEFAULT_SU_BINARY: &str = "su";
pub const DEFAULT_PROCESS_NAME: &str = "frida-server";
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 5;
pub const DEFAULT_CONFIRM_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// Used when no platform data directory can be determined.
const FALLBACK_HOME_DIR: &str = ".fridactl";

#[derive(Debug, Clone)]
pub struct Config {
    /// Private, non-executable storage root. Cache and logs live below it.
    pub home: PathBuf,
    pub release_base_url: String,
    /// Privileged, world-executable directory the server is staged into.
    pub staging_dir: PathBuf,
    pub su_binary: String,
    /// Name matched against the process table by `ps | grep` and `pkill`.
    pub process_name: String,
    pub format: ArtifactFormat,
    pub os_override: Option<OsTag>,
    pub arch_override: Option<ArchTag>,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
    pub command_timeout: Duration,
}

impl Config {
    /// Defaults for every setting, rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            su_binary: DEFAULT_SU_BINARY.to_string(),
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            format: ArtifactFormat::default(),
            os_override: None,
            arch_override: None,
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            confirm_interval: DEFAULT_CONFIRM_INTERVAL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_with(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup; `load` passes
    /// the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Loading fridactl configuration");
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let home = match var("FRIDACTL_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => default_home_dir(),
        };
        debug!("Effective FRIDACTL_HOME set to: {}", home.display());

        let mut config = Self::new(home);

        if let Some(url) = var("FRIDACTL_RELEASE_BASE_URL") {
            debug!("Using release base URL override: {}", url);
            config.release_base_url = url;
        }
        if let Some(dir) = var("FRIDACTL_STAGING_DIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(su) = var("FRIDACTL_SU") {
            config.su_binary = su;
        }
        if let Some(name) = var("FRIDACTL_PROCESS_NAME") {
            config.process_name = name;
        }
        if let Some(format) = var("FRIDACTL_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(os) = var("FRIDACTL_OS") {
            config.os_override = Some(os.parse()?);
        }
        if let Some(arch) = var("FRIDACTL_ARCH") {
            config.arch_override = Some(arch.parse()?);
        }
        if let Some(attempts) = var("FRIDACTL_CONFIRM_ATTEMPTS") {
            config.confirm_attempts = parse_number("FRIDACTL_CONFIRM_ATTEMPTS", &attempts)?;
            if config.confirm_attempts == 0 {
                return Err(FridaError::Config(
                    "FRIDACTL_CONFIRM_ATTEMPTS must be at least 1".to_string(),
                ));
            }
        }
        if let Some(ms) = var("FRIDACTL_CONFIRM_INTERVAL_MS") {
            config.confirm_interval =
                Duration::from_millis(parse_number("FRIDACTL_CONFIRM_INTERVAL_MS", &ms)?);
        }
        if let Some(secs) = var("FRIDACTL_COMMAND_TIMEOUT_SECS") {
            config.command_timeout =
                Duration::from_secs(parse_number("FRIDACTL_COMMAND_TIMEOUT_SECS", &secs)?);
        }

        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("frida")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

fn default_home_dir() -> PathBuf {
    ProjectDirs::from("re", "frida", "fridactl").map_or_else(
        || {
            debug!(
                "No platform data directory available, falling back to {}",
                FALLBACK_HOME_DIR
            );
            PathBuf::from(FALLBACK_HOME_DIR)
        },
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| FridaError::Config(format!("{name} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load_with(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[("FRIDACTL_HOME", "/tmp/fridactl-home")]).unwrap();
        assert_eq!(config.home(), Path::new("/tmp/fridactl-home"));
        assert_eq!(config.release_base_url, DEFAULT_RELEASE_BASE_URL);
        assert_eq!(config.staging_dir(), Path::new("/data/local/tmp"));
        assert_eq!(config.su_binary, "su");
        assert_eq!(config.process_name, "frida-server");
        assert_eq!(config.format, ArtifactFormat::Xz);
        assert_eq!(config.confirm_attempts, 5);
        assert_eq!(config.confirm_interval, Duration::from_secs(1));
        assert!(config.os_override.is_none());
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/fridactl-home/frida"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/fridactl-home/logs"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("FRIDACTL_HOME", "/h"),
            ("FRIDACTL_STAGING_DIR", "/data/tmp"),
            ("FRIDACTL_SU", "/system/xbin/su"),
            ("FRIDACTL_FORMAT", "raw"),
            ("FRIDACTL_OS", "android"),
            ("FRIDACTL_ARCH", "aarch64"),
            ("FRIDACTL_CONFIRM_ATTEMPTS", "3"),
            ("FRIDACTL_CONFIRM_INTERVAL_MS", "250"),
            ("FRIDACTL_COMMAND_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.staging_dir(), Path::new("/data/tmp"));
        assert_eq!(config.su_binary, "/system/xbin/su");
        assert_eq!(config.format, ArtifactFormat::Raw);
        assert_eq!(config.os_override, Some(OsTag::Android));
        assert_eq!(config.arch_override, Some(ArchTag::Arm64));
        assert_eq!(config.confirm_attempts, 3);
        assert_eq!(config.confirm_interval, Duration::from_millis(250));
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = load(&[("FRIDACTL_HOME", "/h"), ("FRIDACTL_SU", "  ")]).unwrap();
        assert_eq!(config.su_binary, "su");
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = load(&[("FRIDACTL_HOME", "/h"), ("FRIDACTL_CONFIRM_ATTEMPTS", "five")])
            .unwrap_err();
        assert!(matches!(err, FridaError::Config(_)));

        let err =
            load(&[("FRIDACTL_HOME", "/h"), ("FRIDACTL_CONFIRM_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, FridaError::Config(_)));
    }
}
