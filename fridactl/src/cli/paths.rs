// fridactl/src/cli/paths.rs
use std::path::Path;

use clap::Args;
use colored::Colorize;
use fridactl_common::cache::ArtifactCache;
use fridactl_common::config::Config;
use fridactl_common::error::Result;
use fridactl_core::FridaManager;

#[derive(Args, Debug)]
pub struct Paths {
    /// frida-server release to describe
    #[arg(id = "frida_version", value_name = "VERSION")]
    pub version: String,
}

impl Paths {
    pub fn run(&self, config: &Config) -> Result<bool> {
        let manager = FridaManager::new(config.clone())?;
        let (key, location, url) = manager.describe(&self.version)?;

        println!("{} {}", format!("{:<13}", "artifact:").bold(), key);
        println!("{} {}", format!("{:<13}", "url:").bold(), url);
        print_path("compressed:", &location.compressed_path);
        print_path("decompressed:", &location.decompressed_path);
        print_path("staged:", &location.staged_path);
        Ok(true)
    }
}

fn print_path(label: &str, path: &Path) {
    let state = if ArtifactCache::exists(path) {
        "present".green()
    } else {
        "absent".dimmed()
    };
    println!(
        "{} {} ({})",
        format!("{label:<13}").bold(),
        path.display(),
        state
    );
}
