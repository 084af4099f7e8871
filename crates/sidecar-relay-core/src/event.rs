use crate::error::SupervisorError;
use crate::process::ExitInfo;

/// Everything a supervised child can report, in one tagged stream
#[derive(Debug)]
pub enum ProcessEvent {
    /// One line of standard output
    Stdout(OutputLine),
    /// One line of standard error
    Stderr(OutputLine),
    /// The child terminated. Emitted once, after both pipes reached EOF.
    Closed(ExitInfo),
    /// Operational failure distinct from a non-zero exit
    Error(SupervisorError),
}

/// A line of child output exactly as written, terminator included.
///
/// Only the final line of a stream may lack a `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    raw: String,
}

impl OutputLine {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The bytes the child wrote, including `\n` or `\r\n` when present
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The line without its terminator
    pub fn text(&self) -> &str {
        let line = self.raw.strip_suffix('\n').unwrap_or(&self.raw);
        line.strip_suffix('\r').unwrap_or(line)
    }
}

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn event(self, line: OutputLine) -> ProcessEvent {
        match self {
            StreamKind::Stdout => ProcessEvent::Stdout(line),
            StreamKind::Stderr => ProcessEvent::Stderr(line),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}
