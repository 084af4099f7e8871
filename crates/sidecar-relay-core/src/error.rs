use thiserror::Error;

/// Error types for process operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Program not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(String),
    #[error("Process timed out after {0} ms")]
    Timeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Classify an `io::Error` returned while spawning `command`
    pub fn from_spawn_io(command: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound(command.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                ProcessError::PermissionDenied(command.to_string())
            }
            _ => ProcessError::SpawnFailed(format!("{command}: {error}")),
        }
    }
}

/// Error taxonomy for a supervised run
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The child could not be started
    #[error("Spawn failure: {0}")]
    Spawn(ProcessError),

    /// The process layer failed while the child was running
    #[error("Runtime process error: {0}")]
    Runtime(ProcessError),

    #[error("Could not resolve program: {0}")]
    Resolve(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SupervisorError {
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, SupervisorError::Spawn(_) | SupervisorError::Resolve(_))
    }

    /// True for the "executable is missing" class of failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, SupervisorError::Spawn(ProcessError::NotFound(_)))
    }
}

/// Failure reported by a log sink. Never surfaces past the relay.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink rejected message: {0}")]
    Rejected(String),
}
