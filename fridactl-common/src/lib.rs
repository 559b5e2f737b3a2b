// fridactl-common/src/lib.rs
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod status;

// Re-export key types
pub use cache::ArtifactCache;
pub use config::Config;
pub use error::{FridaError, Result};
pub use model::{ArchTag, ArtifactFormat, ArtifactKey, ArtifactLocation, OsTag};
pub use status::{status_channel, StatusCategory, StatusEvent, StatusSender};
