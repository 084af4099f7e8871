use crate::factory::{PlatformProcessManager, PlatformProcessManagerFactory};
use crate::resolver::{BundledResolver, ProgramResolver};
use sidecar_relay_core::stdio::forward_lines;
use sidecar_relay_core::{
    Channel, ChildStream, Console, ExitInfo, ProcessError, ProcessEvent, ProcessHandle,
    ProcessLifecycle, ProcessManagerFactory, RunState, SidecarConfig, SpawnOptions, StreamKind,
    SupervisorError, millis_saturating,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type LineCallback = Box<dyn FnMut(&str) + Send>;
type CloseCallback = Box<dyn FnMut(&ExitInfo) + Send>;
type ErrorCallback = Box<dyn FnMut(&SupervisorError) + Send>;

/// Aggregated result of a finished child
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// Everything the child wrote to stdout
    pub stdout: String,
    /// Everything the child wrote to stderr
    pub stderr: String,
    pub status: ExitInfo,
}

#[derive(Default)]
struct Subscriptions {
    on_stdout: Option<LineCallback>,
    on_stderr: Option<LineCallback>,
    on_close: Option<CloseCallback>,
    on_error: Option<ErrorCallback>,
}

// Event kinds nobody subscribed to still end up in the trace log
impl Subscriptions {
    fn stdout(&mut self, line: &str) {
        match self.on_stdout.as_mut() {
            Some(callback) => callback(line),
            None => debug!(stream = "stdout", "{line}"),
        }
    }

    fn stderr(&mut self, line: &str) {
        match self.on_stderr.as_mut() {
            Some(callback) => callback(line),
            None => debug!(stream = "stderr", "{line}"),
        }
    }

    fn close(&mut self, exit: &ExitInfo) {
        match self.on_close.as_mut() {
            Some(callback) => callback(exit),
            None => debug!("Sidecar closed with {exit}"),
        }
    }

    fn error(&mut self, error: &SupervisorError) {
        match self.on_error.as_mut() {
            Some(callback) => callback(error),
            None => debug!("Sidecar error: {error}"),
        }
    }
}

/// Supervises one run of an external program.
///
/// Subscriptions are registered before [`execute`](Self::execute) or
/// [`run`](Self::run), which consume the value: one `Sidecar` is one child.
/// Stdout and stderr are each read on their own task and funnelled, together
/// with the exit and any operational error, through a single event channel
/// that this type drains in order.
pub struct Sidecar<M: ProcessLifecycle = PlatformProcessManager> {
    config: SidecarConfig,
    manager: Arc<M>,
    // Bundled lookup next to the current executable when unset
    resolver: Option<Arc<dyn ProgramResolver>>,
    subscriptions: Subscriptions,
    state: watch::Sender<RunState>,
}

impl Sidecar {
    /// Sidecar on the platform process manager, resolving bundled binaries
    /// next to the current executable
    pub fn new(config: SidecarConfig) -> Self {
        info!(
            "Created Sidecar for {} on platform: {}",
            config.program,
            PlatformProcessManagerFactory::platform_name()
        );
        Self::with_manager(
            config,
            Arc::new(PlatformProcessManagerFactory::create_process_manager()),
        )
    }

    /// Shorthand for a program id, its arguments and an options map
    pub fn sidecar<S: ToString, I: IntoIterator<Item = S>>(
        program: impl Into<String>,
        args: I,
        options: SpawnOptions,
    ) -> Self {
        Self::new(SidecarConfig {
            program: program.into(),
            args: args.into_iter().map(|arg| arg.to_string()).collect(),
            options,
        })
    }
}

impl<M> Sidecar<M>
where
    M: ProcessLifecycle + 'static,
    M::Handle: 'static,
{
    pub fn with_manager(config: SidecarConfig, manager: Arc<M>) -> Self {
        let (state, _) = watch::channel(RunState::NotStarted);
        Self {
            config,
            manager,
            resolver: None,
            subscriptions: Subscriptions::default(),
            state,
        }
    }

    pub fn resolver(mut self, resolver: impl ProgramResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn on_stdout(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.subscriptions.on_stdout = Some(Box::new(callback));
        self
    }

    pub fn on_stderr(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.subscriptions.on_stderr = Some(Box::new(callback));
        self
    }

    /// Fires once, after the child terminated and both pipes drained
    pub fn on_close(mut self, callback: impl FnMut(&ExitInfo) + Send + 'static) -> Self {
        self.subscriptions.on_close = Some(Box::new(callback));
        self
    }

    /// Fires for spawn failures and for runtime failures such as pipe errors
    /// or a timeout. A non-zero exit is not an error.
    pub fn on_error(mut self, callback: impl FnMut(&SupervisorError) + Send + 'static) -> Self {
        self.subscriptions.on_error = Some(Box::new(callback));
        self
    }

    /// Route all four event kinds to `channel` on `console`
    pub fn relay_to(self, console: Arc<Console>, channel: Channel) -> Self {
        let stdout = console.clone();
        let stderr = console.clone();
        let close = console.clone();
        self.on_stdout(move |line| stdout.print(channel, format!("stdout: {line}")))
            .on_stderr(move |line| stderr.print(channel, format!("stderr: {line}")))
            .on_close(move |exit| close.print(channel, format!("close: {exit}")))
            .on_error(move |error| console.print(channel, format!("error: {error}")))
    }

    /// Observe the run's lifecycle
    pub fn state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Run the child to completion.
    ///
    /// Spawn failures are reported to `on_error` and returned; `on_close`
    /// does not fire for them.
    pub async fn execute(mut self) -> Result<CommandOutput, SupervisorError> {
        self.transition(RunState::Spawning);

        let resolver = self.resolver.clone().unwrap_or_else(default_resolver);
        let spawned = spawn_child(&self.config, resolver.as_ref(), self.manager.as_ref()).await;
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.transition(RunState::SpawnFailed(e.to_string()));
                self.subscriptions.error(&e);
                return Err(e);
            }
        };
        self.transition(RunState::Running);

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = tokio::spawn(watch_child(
            handle,
            self.manager.clone(),
            self.config.options.timeout(),
            tx,
        ));

        let output = self.consume(rx).await;
        if let Err(e) = watcher.await {
            warn!("Sidecar watcher task failed: {e}");
        }

        if !self.state.borrow().is_terminal() {
            self.transition(RunState::Exited(output.status));
        }
        Ok(output)
    }

    /// [`execute`](Self::execute), with spawn failures logged to `console`
    /// instead of returned
    pub async fn run(self, console: &Console) -> Option<CommandOutput> {
        match self.execute().await {
            Ok(output) => Some(output),
            Err(e) => {
                console.error(format!("spawn error: {e}"));
                None
            }
        }
    }

    async fn consume(&mut self, mut events: mpsc::UnboundedReceiver<ProcessEvent>) -> CommandOutput {
        let mut output = CommandOutput::default();

        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Stdout(line) => {
                    output.stdout.push_str(line.raw());
                    self.subscriptions.stdout(line.text());
                }
                ProcessEvent::Stderr(line) => {
                    output.stderr.push_str(line.raw());
                    self.subscriptions.stderr(line.text());
                }
                ProcessEvent::Closed(exit) => {
                    output.status = exit;
                    self.transition(RunState::Exited(exit));
                    self.subscriptions.close(&exit);
                }
                ProcessEvent::Error(e) => self.subscriptions.error(&e),
            }
        }

        output
    }

    fn transition(&self, next: RunState) {
        debug!(program = %self.config.program, "Sidecar state: {next}");
        self.state.send_replace(next);
    }
}

async fn spawn_child<M: ProcessLifecycle>(
    config: &SidecarConfig,
    resolver: &dyn ProgramResolver,
    manager: &M,
) -> Result<M::Handle, SupervisorError> {
    config.options.validate()?;

    let path = resolver.resolve(&config.program)?;
    let request = config.spawn_request(path.to_string_lossy().into_owned());

    debug!("Spawning sidecar: {} with args: {:?}", request.command, request.args);
    manager
        .spawn_process(&request)
        .await
        .map_err(SupervisorError::Spawn)
}

fn default_resolver() -> Arc<dyn ProgramResolver> {
    let resolver = BundledResolver::from_current_exe().unwrap_or_else(|e| {
        warn!("{e}; resolving bundled programs against the working directory");
        BundledResolver::new(".")
    });
    Arc::new(resolver)
}

/// Drives one child: pumps both pipes, enforces the timeout, reaps the
/// process, and emits `Closed` last.
///
/// The timeout covers reaping the child and draining both pipes, so
/// descendants still holding the pipes are killed with the process group.
async fn watch_child<M: ProcessLifecycle>(
    mut handle: M::Handle,
    manager: Arc<M>,
    timeout: Option<Duration>,
    events: mpsc::UnboundedSender<ProcessEvent>,
) {
    let mut readers: Vec<JoinHandle<()>> = [
        (handle.take_stdout(), StreamKind::Stdout),
        (handle.take_stderr(), StreamKind::Stderr),
    ]
    .into_iter()
    .filter_map(|(stream, kind)| {
        stream.map(|stream| tokio::spawn(read_stream(stream, kind, events.clone())))
    })
    .collect();

    let exit = match timeout {
        None => finish(&mut handle, &mut readers).await,
        Some(limit) => match tokio::time::timeout(limit, finish(&mut handle, &mut readers)).await {
            Ok(exit) => exit,
            Err(_) => {
                let millis = millis_saturating(limit);
                warn!("Sidecar {} exceeded {} ms, killing it", handle.get_command(), millis);
                let _ = events.send(ProcessEvent::Error(SupervisorError::Runtime(
                    ProcessError::Timeout(millis),
                )));
                if let Some(pid) = handle.get_pid() {
                    let result = manager.terminate(pid).await;
                    debug!("Timeout termination of {pid}: {result:?}");
                }
                finish(&mut handle, &mut readers).await
            }
        },
    };

    let event = match exit {
        Ok(exit) => {
            info!("Sidecar {} finished with {}", handle.get_command(), exit);
            ProcessEvent::Closed(exit)
        }
        Err(e) => ProcessEvent::Error(SupervisorError::Runtime(e)),
    };
    let _ = events.send(event);
}

/// Reap the child, then wait for both pipes to hit EOF.
///
/// Cancel-safe: a reader is only removed once it completed, and waiting on
/// an already reaped child returns its status again.
async fn finish<H: ProcessHandle>(
    handle: &mut H,
    readers: &mut Vec<JoinHandle<()>>,
) -> Result<ExitInfo, ProcessError> {
    let exit = handle.wait().await;
    while let Some(reader) = readers.last_mut() {
        let joined = reader.await;
        readers.pop();
        if let Err(e) = joined {
            warn!("Sidecar output reader failed: {e}");
        }
    }
    exit
}

async fn read_stream(
    stream: ChildStream,
    kind: StreamKind,
    events: mpsc::UnboundedSender<ProcessEvent>,
) {
    if let Err(e) = forward_lines(stream, kind, events.clone()).await {
        warn!("Failed reading sidecar {}: {e}", kind.name());
        let _ = events.send(ProcessEvent::Error(SupervisorError::Runtime(
            ProcessError::Io(e),
        )));
    }
}
