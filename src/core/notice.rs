//! Non-fatal, user-visible notifications.

use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// No fresh or stale rate was available, identity was used instead
    RateUnavailable { from: String, to: String },
    Disconnected(String),
    OperationFailed(String),
    Info(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::RateUnavailable { from, to } => {
                write!(f, "Exchange rate unavailable: {from} -> {to}, using 1.0")
            }
            Notice::Disconnected(msg) => write!(f, "Backend unreachable: {msg}"),
            Notice::OperationFailed(msg) => write!(f, "Operation failed: {msg}"),
            Notice::Info(msg) => write!(f, "{msg}"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        warn!(%notice, "Notice");
    }
}

/// Keeps every notice in memory, mostly useful to inspect what happened.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
