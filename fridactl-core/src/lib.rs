// fridactl-core/src/lib.rs

pub mod install;
pub mod manager;
pub mod pipeline;
pub mod platform;
pub mod process;

pub use fridactl_net::DownloadProgress;
pub use manager::{FridaManager, ProgressObserver, StartOutcome, StopOutcome};
pub use pipeline::OperationHandle;
pub use process::{ElevatedShell, SuShell, SupervisedProcess};
