pub mod shell;
pub mod supervisor;

pub use shell::{CommandOutput, ElevatedShell, SuShell};
pub use supervisor::{KillOutcome, SupervisedProcess};
