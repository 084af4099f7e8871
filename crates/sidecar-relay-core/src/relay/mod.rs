//! Console-style output that is also forwarded to a structured log sink.

mod console;
mod message;
mod sink;

pub use console::{Console, Handler};
pub use message::{Channel, LogMessage, Severity};
pub use sink::{LogSink, RelaySink};
