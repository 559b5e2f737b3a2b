// fridactl-core/src/platform.rs
//! Resolves the OS and architecture tags used in release asset names.
//!
//! Classification never fails: unrecognised input falls through to `x86` /
//! `unknown` so a best-effort file name can always be produced.

use std::env;

use fridactl_common::config::Config;
use fridactl_common::model::{ArchTag, OsTag};
use tracing::debug;

/// Raw host facts the classifier works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub arch: String,
    pub os_name: String,
    pub in_android_runtime: bool,
}

impl HostFacts {
    pub fn detect() -> Self {
        Self {
            arch: env::consts::ARCH.to_string(),
            os_name: env::consts::OS.to_string(),
            in_android_runtime: in_android_runtime(),
        }
    }
}

// The Android runtime exports both variables to every app process; a plain
// Linux host running an android build target counts as well.
fn in_android_runtime() -> bool {
    cfg!(target_os = "android")
        || (env::var_os("ANDROID_ROOT").is_some() && env::var_os("ANDROID_DATA").is_some())
}

pub fn classify_arch(arch: &str) -> ArchTag {
    let arch = arch.to_lowercase();
    if arch.contains("aarch64") || arch.contains("arm64") {
        ArchTag::Arm64
    } else if arch.contains("arm") {
        ArchTag::Arm
    } else if arch.contains("x86_64") || arch.contains("amd64") {
        ArchTag::X86_64
    } else {
        ArchTag::X86
    }
}

pub fn classify_os(facts: &HostFacts) -> OsTag {
    if facts.in_android_runtime {
        return OsTag::Android;
    }
    let os_name = facts.os_name.to_lowercase();
    if os_name.contains("linux") {
        OsTag::Linux
    } else if os_name.contains("windows") {
        OsTag::Windows
    } else if os_name.contains("mac") || os_name.contains("darwin") {
        OsTag::Darwin
    } else {
        OsTag::Unknown
    }
}

pub fn identify_host(facts: &HostFacts) -> (OsTag, ArchTag) {
    (classify_os(facts), classify_arch(&facts.arch))
}

/// Host tags with configured overrides applied.
pub fn identify(config: &Config) -> (OsTag, ArchTag) {
    let facts = HostFacts::detect();
    let (os, arch) = identify_host(&facts);
    let os = config.os_override.unwrap_or(os);
    let arch = config.arch_override.unwrap_or(arch);
    debug!(
        "Resolved platform {}-{} (host arch '{}', os '{}', android runtime: {})",
        os, arch, facts.arch, facts.os_name, facts.in_android_runtime
    );
    (os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(arch: &str, os_name: &str, android: bool) -> HostFacts {
        HostFacts {
            arch: arch.to_string(),
            os_name: os_name.to_string(),
            in_android_runtime: android,
        }
    }

    #[test]
    fn arch_precedence() {
        assert_eq!(classify_arch("aarch64"), ArchTag::Arm64);
        assert_eq!(classify_arch("ARM64"), ArchTag::Arm64);
        assert_eq!(classify_arch("armv7l"), ArchTag::Arm);
        assert_eq!(classify_arch("arm"), ArchTag::Arm);
        assert_eq!(classify_arch("x86_64"), ArchTag::X86_64);
        assert_eq!(classify_arch("amd64"), ArchTag::X86_64);
        assert_eq!(classify_arch("i686"), ArchTag::X86);
        assert_eq!(classify_arch(""), ArchTag::X86);
        assert_eq!(classify_arch("riscv64"), ArchTag::X86);
    }

    #[test]
    fn android_runtime_wins_over_kernel_name() {
        assert_eq!(classify_os(&facts("aarch64", "linux", true)), OsTag::Android);
    }

    #[test]
    fn host_os_names() {
        assert_eq!(classify_os(&facts("", "Linux", false)), OsTag::Linux);
        assert_eq!(classify_os(&facts("", "Windows 11", false)), OsTag::Windows);
        assert_eq!(classify_os(&facts("", "Mac OS X", false)), OsTag::Darwin);
        assert_eq!(classify_os(&facts("", "macos", false)), OsTag::Darwin);
        assert_eq!(classify_os(&facts("", "freebsd", false)), OsTag::Unknown);
        assert_eq!(classify_os(&facts("", "", false)), OsTag::Unknown);
    }

    #[test]
    fn identify_host_is_deterministic() {
        let f = facts("aarch64", "linux", true);
        assert_eq!(identify_host(&f), (OsTag::Android, ArchTag::Arm64));
        assert_eq!(identify_host(&f), identify_host(&f));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::new("/h");
        config.os_override = Some(OsTag::Android);
        config.arch_override = Some(ArchTag::Arm);
        assert_eq!(identify(&config), (OsTag::Android, ArchTag::Arm));
    }
}
