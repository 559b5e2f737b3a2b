// fridactl/src/cli/stop.rs
use clap::Args;
use fridactl_common::config::Config;
use fridactl_common::error::{FridaError, Result};
use fridactl_common::status::status_channel;
use fridactl_core::{FridaManager, StopOutcome};
use tracing::debug;

use crate::cli::events::EventPrinter;

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Print status events as JSON lines.
    #[arg(long)]
    pub json: bool,
}

impl StopArgs {
    pub fn run(&self, config: &Config) -> Result<bool> {
        let printer = EventPrinter::new(self.json);
        let manager = FridaManager::new(config.clone())?;

        let (sink, rx) = status_channel();
        let handle = manager.stop(sink);
        printer.drain(&rx);

        let outcome = handle
            .join()
            .map_err(|msg| FridaError::Generic(format!("Stop worker panicked: {msg}")))?;
        debug!("Stop finished: {:?}", outcome);
        Ok(outcome != StopOutcome::Failed)
    }
}
