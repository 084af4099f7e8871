use super::message::{LogMessage, Severity};
use crate::error::SinkError;
use async_trait::async_trait;
use derive_more::From;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Structured, asynchronous destination for relayed console output
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn emit(&self, message: &LogMessage) -> Result<(), SinkError>;
}

#[async_trait]
impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    async fn emit(&self, message: &LogMessage) -> Result<(), SinkError> {
        (**self).emit(message).await
    }
}

#[derive(From)]
enum SinkCommand {
    Emit(LogMessage),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget handle to a [`LogSink`] running on its own task.
///
/// Messages are queued without bound and delivered in submission order.
/// A message the sink rejects is counted and dropped; nothing is retried.
#[derive(Clone)]
pub struct RelaySink {
    tx: mpsc::UnboundedSender<SinkCommand>,
    dropped: Arc<AtomicU64>,
}

impl RelaySink {
    /// Start the delivery task. Must be called within a Tokio runtime.
    pub fn spawn<S: LogSink + 'static>(sink: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dropped = Arc::new(AtomicU64::new(0));
        tokio::spawn(drain(sink, rx, dropped.clone()));
        Self { tx, dropped }
    }

    /// Queue a message. Never blocks and never reports failure.
    pub fn submit(&self, severity: Severity, text: &str) {
        if self.tx.send(LogMessage::new(severity, text).into()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Resolves once everything submitted before this call reached the sink
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(done_tx.into()).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Number of messages the sink failed to accept so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn drain<S: LogSink>(
    sink: S,
    mut rx: mpsc::UnboundedReceiver<SinkCommand>,
    dropped: Arc<AtomicU64>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SinkCommand::Emit(message) => {
                if let Err(e) = sink.emit(&message).await {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(severity = %message.severity(), error = %e, "Log sink dropped message");
                }
            }
            SinkCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
