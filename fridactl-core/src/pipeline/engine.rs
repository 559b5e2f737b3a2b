// fridactl-core/src/pipeline/engine.rs
//! Runs one operation on its own named OS thread with a private
//! current-thread runtime, so callers never block and never need a runtime
//! of their own.
use std::any::Any;
use std::future::Future;
use std::thread::{self, JoinHandle};

use fridactl_common::error::FridaError;
use tracing::{debug, error};

/// Handle to an operation started by [`spawn_worker`].
///
/// `Finished` only occurs when the worker could not be started at all; the
/// fallback outcome is then available immediately.
#[derive(Debug)]
pub enum OperationHandle<T> {
    Running(JoinHandle<T>),
    Finished(T),
}

impl<T> OperationHandle<T> {
    pub fn is_finished(&self) -> bool {
        match self {
            OperationHandle::Running(handle) => handle.is_finished(),
            OperationHandle::Finished(_) => true,
        }
    }

    /// Waits for the outcome. A worker panic is returned as its message.
    pub fn join(self) -> Result<T, String> {
        match self {
            OperationHandle::Running(handle) => handle.join().map_err(get_panic_message),
            OperationHandle::Finished(outcome) => Ok(outcome),
        }
    }
}

pub(crate) fn get_panic_message(e: Box<dyn Any + Send>) -> String {
    match e.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_string(),
        None => match e.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Unknown panic payload".to_string(),
        },
    }
}

/// Spawns `job` on a thread called `name`.
///
/// `fallback` turns an infrastructure failure (thread or runtime creation)
/// into an outcome, so the caller always gets a `T` back.
pub fn spawn_worker<T, J, Fut, B>(name: &str, fallback: B, job: J) -> OperationHandle<T>
where
    T: Send + 'static,
    J: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    B: Fn(FridaError) -> T + Clone + Send + 'static,
{
    let worker_fallback = fallback.clone();
    let spawned = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create worker runtime: {}", e);
                    return worker_fallback(FridaError::from(e));
                }
            };
            debug!("Worker runtime ready");
            runtime.block_on(job())
        });

    match spawned {
        Ok(handle) => OperationHandle::Running(handle),
        Err(e) => {
            error!("Failed to spawn worker thread '{}': {}", name, e);
            OperationHandle::Finished(fallback(FridaError::from(e)))
        }
    }
}
