//! User-visible status notifications

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Where outcome messages go
pub trait StatusSink {
    fn notify(&self, message: &str, severity: Severity);
}

/// Forwards notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!(?severity, "{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

/// Keeps every notification in memory
///
/// Cloned handles share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatus {
    messages: Arc<Mutex<Vec<(String, Severity)>>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().clone()
    }

    /// Most recent notification
    pub fn last(&self) -> Option<(String, Severity)> {
        self.messages.lock().last().cloned()
    }
}

impl StatusSink for RecordingStatus {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages.lock().push((message.to_string(), severity));
    }
}
