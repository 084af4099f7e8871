use super::message::Channel;
use super::sink::RelaySink;
use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A print handler for one channel
pub type Handler = Arc<dyn Fn(&str) + Send + Sync>;

/// Dispatcher for print-style output.
///
/// Holds one active [`Handler`] per [`Channel`]. The table is expected to be
/// set up once at startup through [`Console::install`] and only read
/// afterwards. Each install wraps whatever handler is current, so local
/// output always runs first and every installed sink sees each print once.
pub struct Console {
    handlers: RwLock<[Handler; 5]>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Console writing log/debug/info to stdout and warn/error to stderr
    pub fn new() -> Self {
        let stdout: Handler = Arc::new(|text: &str| {
            let _ = writeln!(std::io::stdout().lock(), "{text}");
        });
        let stderr: Handler = Arc::new(|text: &str| {
            let _ = writeln!(std::io::stderr().lock(), "{text}");
        });

        Self {
            handlers: RwLock::new([
                stdout.clone(),
                stdout.clone(),
                stdout,
                stderr.clone(),
                stderr,
            ]),
        }
    }

    /// Replace the local handler for `channel`
    pub fn with_handler(self, channel: Channel, handler: Handler) -> Self {
        self.set_handler(channel, handler);
        self
    }

    pub fn set_handler(&self, channel: Channel, handler: Handler) {
        self.write()[channel.index()] = handler;
    }

    /// Forward every print on `channel` to `sink` after the current handler ran.
    pub fn install(&self, channel: Channel, sink: &RelaySink) {
        let severity = channel.severity();
        let sink = sink.clone();

        let mut handlers = self.write();
        let original = handlers[channel.index()].clone();
        handlers[channel.index()] = Arc::new(move |text: &str| {
            original(text);
            sink.submit(severity, text);
        });
    }

    /// [`install`](Self::install) `sink` on all five channels
    pub fn forward_all(&self, sink: &RelaySink) {
        for channel in Channel::ALL {
            self.install(channel, sink);
        }
    }

    pub fn print(&self, channel: Channel, text: impl AsRef<str>) {
        // Clone out of the lock so handlers may print re-entrantly
        let handler = self.read()[channel.index()].clone();
        handler(text.as_ref());
    }

    pub fn log(&self, text: impl AsRef<str>) {
        self.print(Channel::Log, text);
    }

    pub fn debug(&self, text: impl AsRef<str>) {
        self.print(Channel::Debug, text);
    }

    pub fn info(&self, text: impl AsRef<str>) {
        self.print(Channel::Info, text);
    }

    pub fn warn(&self, text: impl AsRef<str>) {
        self.print(Channel::Warn, text);
    }

    pub fn error(&self, text: impl AsRef<str>) {
        self.print(Channel::Error, text);
    }

    fn read(&self) -> RwLockReadGuard<'_, [Handler; 5]> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, [Handler; 5]> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
