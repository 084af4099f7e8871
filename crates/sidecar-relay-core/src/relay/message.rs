use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Level a message is delivered to the sink at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five print-style entry points a [`Console`](super::Console) exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Log,
        Channel::Debug,
        Channel::Info,
        Channel::Warn,
        Channel::Error,
    ];

    /// Severity the channel forwards at. Plain `log` output is trace.
    pub fn severity(self) -> Severity {
        match self {
            Channel::Log => Severity::Trace,
            Channel::Debug => Severity::Debug,
            Channel::Info => Severity::Info,
            Channel::Warn => Severity::Warn,
            Channel::Error => Severity::Error,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One intercepted print call. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    severity: Severity,
    text: String,
    timestamp: SystemTime,
}

impl LogMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)
    }
}
