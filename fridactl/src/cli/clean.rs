// fridactl/src/cli/clean.rs
use clap::Args;
use colored::Colorize;
use fridactl_common::cache::ArtifactCache;
use fridactl_common::config::Config;
use fridactl_common::error::Result;
use tracing::debug;

#[derive(Args, Debug)]
pub struct Clean {
    /// Only remove this release; everything cached when omitted.
    #[arg(id = "frida_version", value_name = "VERSION")]
    pub version: Option<String>,
}

impl Clean {
    /// Never touches the staging directory.
    pub fn run(&self, config: &Config) -> Result<bool> {
        let cache = ArtifactCache::new(config);
        debug!("Cleaning cache at {}", cache.get_dir().display());
        match &self.version {
            Some(version) => {
                if cache.clear_version(version)? {
                    println!("{} cached artifacts for {}", "Removed".green().bold(), version);
                } else {
                    println!("Nothing cached for {version}");
                }
            }
            None => {
                cache.clear_all()?;
                println!("{} {}", "Cleared".green().bold(), cache.get_dir().display());
            }
        }
        Ok(true)
    }
}
