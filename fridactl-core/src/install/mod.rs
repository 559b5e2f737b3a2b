// fridactl-core/src/install/mod.rs
// Turning a cached artifact into a runnable, privileged copy.

pub mod decompress;
pub mod stage;

pub use decompress::decompress_xz;
pub use stage::stage;
