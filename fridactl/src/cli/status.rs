// fridactl/src/cli/status.rs
use clap::Args;
use colored::Colorize;
use fridactl_common::config::Config;
use fridactl_common::error::Result;
use fridactl_core::FridaManager;

#[derive(Args, Debug)]
pub struct Status;

impl Status {
    /// Succeeds only when the server shows up in the process table.
    pub fn run(&self, config: &Config) -> Result<bool> {
        let manager = FridaManager::new(config.clone())?;
        let lines = manager.query()?;
        if lines.is_empty() {
            println!(
                "{} no '{}' process found",
                "stopped:".yellow().bold(),
                config.process_name
            );
            return Ok(false);
        }
        println!("{} {}", "running:".green().bold(), config.process_name);
        for line in lines {
            println!("  {line}");
        }
        Ok(true)
    }
}
