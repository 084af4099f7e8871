#[cfg(unix)]
mod unix_impl {
    use async_trait::async_trait;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use sidecar_relay_core::{
        ChildStream, ExitInfo, ProcessError, ProcessHandle, ProcessId, ProcessLifecycle,
        SpawnRequest, TerminationResult,
    };
    use std::process::Stdio;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Unix-specific process handle implementation
    pub struct UnixProcessHandle {
        child: Child,
        // Also the process group id; tokio forgets it once the child is reaped
        pid: Option<ProcessId>,
        command: String,
        args: Vec<String>,
    }

    impl UnixProcessHandle {
        pub fn new(child: Child, command: String, args: Vec<String>) -> Self {
            Self {
                pid: child.id(),
                child,
                command,
                args,
            }
        }
    }

    #[async_trait]
    impl ProcessHandle for UnixProcessHandle {
        fn get_pid(&self) -> Option<ProcessId> {
            self.pid
        }

        fn get_command(&self) -> &str {
            &self.command
        }

        fn get_args(&self) -> &[String] {
            &self.args
        }

        fn take_stdout(&mut self) -> Option<ChildStream> {
            self.child
                .stdout
                .take()
                .map(|out| Box::new(out) as ChildStream)
        }

        fn take_stderr(&mut self) -> Option<ChildStream> {
            self.child
                .stderr
                .take()
                .map(|err| Box::new(err) as ChildStream)
        }

        async fn wait(&mut self) -> Result<ExitInfo, ProcessError> {
            let status = self.child.wait().await?;
            Ok(ExitInfo::from(status))
        }
    }

    /// Spawns children into their own process group so a timeout can take
    /// down everything the sidecar started.
    #[derive(Debug, Default)]
    pub struct UnixProcessManager;

    impl UnixProcessManager {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl ProcessLifecycle for UnixProcessManager {
        type Handle = UnixProcessHandle;

        async fn spawn_process(
            &self,
            request: &SpawnRequest,
        ) -> Result<UnixProcessHandle, ProcessError> {
            let mut cmd = Command::new(&request.command);
            cmd.args(&request.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            // Set working directory
            if let Some(dir) = &request.working_dir {
                cmd.current_dir(dir);
            }

            // Set environment variables
            if request.clear_env {
                cmd.env_clear();
            }
            cmd.envs(&request.env);

            // Create new process group for better process tree management
            cmd.process_group(0);

            let child = cmd
                .spawn()
                .map_err(|e| ProcessError::from_spawn_io(&request.command, e))?;

            if let Some(pid) = child.id() {
                info!(
                    "Spawned Unix process: {} (PID: {}) with args: {:?}",
                    request.command, pid, request.args
                );
            }

            Ok(UnixProcessHandle::new(
                child,
                request.command.clone(),
                request.args.clone(),
            ))
        }

        async fn terminate(&self, pid: ProcessId) -> TerminationResult {
            let pgid = NixPid::from_raw(pid as i32);

            match signal::killpg(pgid, Signal::SIGKILL) {
                Ok(()) => {
                    info!("Sent SIGKILL to process group {}", pid);
                    TerminationResult::Success
                }
                Err(nix::errno::Errno::ESRCH) => {
                    info!("Process group {} not found (already terminated)", pid);
                    TerminationResult::ProcessNotFound
                }
                Err(nix::errno::Errno::EPERM) => {
                    warn!("Permission denied to terminate process group {}", pid);
                    TerminationResult::AccessDenied
                }
                Err(e) => {
                    warn!("Failed to send SIGKILL to process group {}: {}", pid, e);
                    TerminationResult::Failed(format!("SIGKILL to process group failed: {e}"))
                }
            }
        }
    }

}

// Re-export the Unix implementation when on Unix systems
#[cfg(unix)]
pub use unix_impl::{UnixProcessHandle, UnixProcessManager};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixProcessHandle;

#[cfg(not(unix))]
#[derive(Debug, Default)]
pub struct UnixProcessManager;

#[cfg(not(unix))]
impl UnixProcessManager {
    pub fn new() -> Self {
        Self
    }
}
