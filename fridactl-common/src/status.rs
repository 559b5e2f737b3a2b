// fridactl-common/src/status.rs
//! Status events flowing from a worker to whoever observes it.
use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::error::FridaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
    Info,
    Success,
    Warning,
    Error,
    /// One line of process-table output for the supervised server.
    ProcessInfo,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Info => "INFO",
            StatusCategory::Success => "SUCCESS",
            StatusCategory::Warning => "WARNING",
            StatusCategory::Error => "ERROR",
            StatusCategory::ProcessInfo => "PROCESS_INFO",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub category: StatusCategory,
    pub message: String,
}

impl StatusEvent {
    pub fn new(category: StatusCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Sending half of the status channel. Emission never fails: once the
/// receiver is gone, events are dropped.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: Sender<StatusEvent>,
}

impl StatusSender {
    pub fn emit(&self, category: StatusCategory, message: impl Into<String>) {
        self.tx.send(StatusEvent::new(category, message)).ok();
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StatusCategory::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StatusCategory::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(StatusCategory::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(StatusCategory::Error, message);
    }

    pub fn process_info(&self, message: impl Into<String>) {
        self.emit(StatusCategory::ProcessInfo, message);
    }

    /// Reports a failed step: benign failures as WARNING, the rest as ERROR.
    pub fn failure(&self, context: &str, err: &FridaError) {
        let message = format!("{context}: {err}");
        if err.is_benign() {
            self.warning(message);
        } else {
            self.error(message);
        }
    }
}

/// Unbounded so a slow consumer never stalls the worker.
pub fn status_channel() -> (StatusSender, Receiver<StatusEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (StatusSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_emission_order() {
        let (tx, rx) = status_channel();
        tx.info("one");
        tx.success("two");
        tx.process_info("three");
        drop(tx);
        let got: Vec<StatusEvent> = rx.iter().collect();
        assert_eq!(
            got,
            vec![
                StatusEvent::new(StatusCategory::Info, "one"),
                StatusEvent::new(StatusCategory::Success, "two"),
                StatusEvent::new(StatusCategory::ProcessInfo, "three"),
            ]
        );
    }

    #[test]
    fn emitting_after_receiver_dropped_is_silent() {
        let (tx, rx) = status_channel();
        drop(rx);
        tx.error("nobody listens");
    }

    #[test]
    fn failure_maps_benign_errors_to_warning() {
        let (tx, rx) = status_channel();
        tx.failure(
            "Confirm",
            &FridaError::ConfirmationTimeout {
                name: "frida-server".into(),
                attempts: 5,
            },
        );
        tx.failure("Stage", &FridaError::Privilege("cp exited with 1".into()));
        let got: Vec<StatusCategory> = rx.try_iter().map(|e| e.category).collect();
        assert_eq!(got, vec![StatusCategory::Warning, StatusCategory::Error]);
    }

    #[test]
    fn serializes_category_like_the_log_tags() {
        let json =
            serde_json::to_string(&StatusEvent::new(StatusCategory::ProcessInfo, "x")).unwrap();
        assert_eq!(json, r#"{"category":"PROCESS_INFO","message":"x"}"#);
    }
}
