pub mod engine;
pub(crate) mod worker;

pub use engine::{spawn_worker, OperationHandle};
