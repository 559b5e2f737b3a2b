// src/model/mod.rs
pub mod artifact;
pub mod platform;

pub use artifact::{ArtifactFormat, ArtifactKey, ArtifactLocation};
pub use platform::{ArchTag, OsTag};
