use crate::error::ProcessError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::io::AsyncRead;

/// Unique identifier for a process
pub type ProcessId = u32;

/// One of the child's output pipes, detached from its handle
pub type ChildStream = Box<dyn AsyncRead + Send + Unpin>;

/// Terminal status of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, absent when the process was killed by a signal
    pub code: Option<i32>,
    /// Terminating signal (Unix only)
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn from_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitInfo {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "terminated by signal {signal}"),
            (None, None) => write!(f, "exit status unknown"),
        }
    }
}

/// Lifecycle of one supervised invocation.
///
/// `Exited` and `SpawnFailed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotStarted,
    Spawning,
    Running,
    Exited(ExitInfo),
    SpawnFailed(String),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Exited(_) | RunState::SpawnFailed(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "not started"),
            RunState::Spawning => write!(f, "spawning"),
            RunState::Running => write!(f, "running"),
            RunState::Exited(exit) => write!(f, "exited ({exit})"),
            RunState::SpawnFailed(reason) => write!(f, "spawn failed ({reason})"),
        }
    }
}

/// Result of a process termination operation
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Process was successfully terminated
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Insufficient privileges to signal the process
    AccessDenied,
    /// Operation failed with specific error message
    Failed(String),
}

/// Everything the platform layer needs to start one child
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    /// Start from an empty environment instead of inheriting the parent's
    pub clear_env: bool,
}

/// Trait representing a handle to a running process
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Get the process ID (None if process has exited)
    fn get_pid(&self) -> Option<ProcessId>;

    /// Get the command that started this process
    fn get_command(&self) -> &str;

    /// Get the arguments passed to this process
    fn get_args(&self) -> &[String];

    /// Detach the stdout pipe. Returns `None` on the second call.
    fn take_stdout(&mut self) -> Option<ChildStream>;

    /// Detach the stderr pipe. Returns `None` on the second call.
    fn take_stderr(&mut self) -> Option<ChildStream>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<ExitInfo, ProcessError>;
}

/// Platform primitive for starting and stopping children
#[async_trait]
pub trait ProcessLifecycle: Send + Sync {
    /// The type of process handle this lifecycle manager produces
    type Handle: ProcessHandle;

    /// Spawn a new process with piped stdout and stderr
    async fn spawn_process(&self, request: &SpawnRequest) -> Result<Self::Handle, ProcessError>;

    /// Kill the process (and anything it started) without waiting for it
    async fn terminate(&self, pid: ProcessId) -> TerminationResult;
}

/// Factory trait for creating platform-specific process managers
pub trait ProcessManagerFactory {
    /// The type of process manager this factory creates
    type Manager: ProcessLifecycle;

    /// Create a process manager for the current platform
    fn create_process_manager() -> Self::Manager;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}
