// fridactl/src/cli/start.rs
use clap::Args;
use fridactl_common::config::Config;
use fridactl_common::error::{FridaError, Result};
use fridactl_common::status::status_channel;
use fridactl_core::{FridaManager, StartOutcome};
use tracing::debug;

use crate::cli::events::EventPrinter;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// frida-server release to run, e.g. 16.1.4
    #[arg(id = "frida_version", value_name = "VERSION")]
    pub version: String,

    /// Print status events as JSON lines.
    #[arg(long)]
    pub json: bool,
}

impl StartArgs {
    pub fn run(&self, config: &Config) -> Result<bool> {
        let printer = EventPrinter::new(self.json);
        let manager =
            FridaManager::new(config.clone())?.with_progress_observer(printer.progress_observer());

        let (sink, rx) = status_channel();
        let handle = manager.start(&self.version, sink);
        let errors = printer.drain(&rx);

        let outcome = handle
            .join()
            .map_err(|msg| FridaError::Generic(format!("Start worker panicked: {msg}")))?;
        debug!("Start finished: {:?} ({} error events)", outcome, errors);
        Ok(matches!(outcome, StartOutcome::Launched { .. }))
    }
}
