//! Tracing initialisation and the tracing-backed log sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sidecar_relay_core::{LogMessage, LogSink, Severity, SinkError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub default_filter: String,

    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.default_filter.clone()),
    );

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    Ok(())
}

/// Re-emits console messages as tracing events under the `console` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn emit(&self, message: &LogMessage) -> Result<(), SinkError> {
        let text = message.text();
        match message.severity() {
            Severity::Trace => tracing::trace!(target: "console", "{text}"),
            Severity::Debug => tracing::debug!(target: "console", "{text}"),
            Severity::Info => tracing::info!(target: "console", "{text}"),
            Severity::Warn => tracing::warn!(target: "console", "{text}"),
            Severity::Error => tracing::error!(target: "console", "{text}"),
        }
        Ok(())
    }
}
