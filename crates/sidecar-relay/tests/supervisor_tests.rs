use sidecar_relay::{
    BundledResolver, Channel, Console, ExitInfo, Handler, ProcessError, RunState, Sidecar,
    SidecarConfig, SpawnOptions, SupervisorError, SystemResolver,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Events = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

fn shell(script: &str) -> Sidecar {
    let config = SidecarConfig::builder()
        .program("sh")
        .args(["-c", script])
        .build()
        .expect("Failed to create test SidecarConfig");
    Sidecar::new(config).resolver(SystemResolver)
}

/// Record every event as `kind:payload`
fn recorded(sidecar: Sidecar, events: &Events) -> Sidecar {
    let (out, err, close, error) = (
        events.clone(),
        events.clone(),
        events.clone(),
        events.clone(),
    );
    sidecar
        .on_stdout(move |line| out.lock().unwrap().push(format!("stdout:{line}")))
        .on_stderr(move |line| err.lock().unwrap().push(format!("stderr:{line}")))
        .on_close(move |exit| close.lock().unwrap().push(format!("close:{exit}")))
        .on_error(move |e| error.lock().unwrap().push(format!("error:{e}")))
}

fn capturing_console(lines: &Events) -> Console {
    Channel::ALL.into_iter().fold(Console::new(), |console, channel| {
        let lines = lines.clone();
        let handler: Handler =
            Arc::new(move |text: &str| lines.lock().unwrap().push(format!("{channel:?}:{text}")));
        console.with_handler(channel, handler)
    })
}

fn numbered(events: &[String], prefix: &str) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| event.strip_prefix(prefix))
        .map(|n| n.parse().unwrap())
        .collect()
}

#[tokio::test]
async fn test_happy_path_event_order() {
    init_tracing();
    let events = Events::default();
    let sidecar = recorded(shell("echo A"), &events);
    let state = sidecar.state();

    let output = sidecar.execute().await.unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["stdout:A", "close:exit code 0"]);
    assert_eq!(output.stdout, "A\n");
    assert_eq!(output.stderr, "");
    assert_eq!(output.status, ExitInfo::from_code(0));
    assert_eq!(*state.borrow(), RunState::Exited(ExitInfo::from_code(0)));
}

#[tokio::test]
async fn test_missing_program_is_contained() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let events = Events::default();
    let console_lines = Events::default();
    let console = capturing_console(&console_lines);

    let not_found = Arc::new(Mutex::new(false));
    let flag = not_found.clone();
    let sidecar = recorded(
        Sidecar::sidecar("./does-not-exist", Vec::<String>::new(), SpawnOptions::default())
            .resolver(BundledResolver::new(dir.path())),
        &events,
    );
    let sidecar = sidecar.on_error(move |e| *flag.lock().unwrap() = e.is_not_found());
    let state = sidecar.state();

    let output = sidecar.run(&console).await;

    assert!(output.is_none());
    assert!(*not_found.lock().unwrap());
    assert!(events.lock().unwrap().iter().all(|e| !e.starts_with("close:")));
    assert!(matches!(*state.borrow(), RunState::SpawnFailed(_)));

    let console_lines = console_lines.lock().unwrap();
    assert_eq!(console_lines.len(), 1);
    assert!(console_lines[0].starts_with("Error:spawn error: "));
    assert!(console_lines[0].contains("does-not-exist"));
}

#[tokio::test]
async fn test_execute_reports_not_found() {
    let err = Sidecar::sidecar("definitely-not-a-real-program-xyz", ["--help"], SpawnOptions::default())
        .resolver(SystemResolver)
        .execute()
        .await
        .unwrap_err();

    assert!(err.is_spawn_failure());
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_zero_exit_is_not_an_error() {
    let events = Events::default();
    let output = recorded(shell("echo oops >&2; exit 7"), &events)
        .execute()
        .await
        .unwrap();

    assert_eq!(output.status, ExitInfo::from_code(7));
    assert!(!output.status.success());
    assert_eq!(output.stderr, "oops\n");
    assert_eq!(
        *events.lock().unwrap(),
        vec!["stderr:oops", "close:exit code 7"]
    );
}

#[tokio::test]
async fn test_streams_keep_their_own_order() {
    let events = Events::default();
    let script = "i=1; while [ $i -le 200 ]; do echo $i; echo $i >&2; i=$((i+1)); done";
    let output = recorded(shell(script), &events).execute().await.unwrap();

    let events = events.lock().unwrap();
    let expected: Vec<usize> = (1..=200).collect();
    assert_eq!(numbered(&events, "stdout:"), expected);
    assert_eq!(numbered(&events, "stderr:"), expected);
    assert_eq!(events.last().map(String::as_str), Some("close:exit code 0"));
    assert_eq!(output.stdout.lines().count(), 200);
    assert_eq!(output.stderr.lines().count(), 200);
}

#[tokio::test]
async fn test_unterminated_last_line_is_delivered() {
    let events = Events::default();
    let output = recorded(shell("printf 'one\\ntwo'"), &events)
        .execute()
        .await
        .unwrap();

    assert_eq!(output.stdout, "one\ntwo");
    assert_eq!(
        *events.lock().unwrap(),
        vec!["stdout:one", "stdout:two", "close:exit code 0"]
    );
}

#[tokio::test]
async fn test_output_keeps_what_the_child_wrote() {
    let events = Events::default();
    let output = recorded(shell("printf 'one\\r\\ntwo'; printf 'err\\r\\n' >&2"), &events)
        .execute()
        .await
        .unwrap();

    assert_eq!(output.stdout, "one\r\ntwo");
    assert_eq!(output.stderr, "err\r\n");

    let events = events.lock().unwrap();
    assert!(events.contains(&"stdout:one".to_string()));
    assert!(events.contains(&"stdout:two".to_string()));
    assert!(events.contains(&"stderr:err".to_string()));
}

#[tokio::test]
async fn test_timeout_kills_child() {
    init_tracing();
    let events = Events::default();
    let config = SidecarConfig::builder()
        .program("sh")
        .args(["-c", "echo started; sleep 30"])
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let timed_out = Arc::new(Mutex::new(false));
    let flag = timed_out.clone();
    let sidecar = recorded(Sidecar::new(config).resolver(SystemResolver), &events).on_error(
        move |e| {
            *flag.lock().unwrap() =
                matches!(e, SupervisorError::Runtime(ProcessError::Timeout(300)));
        },
    );

    let started = Instant::now();
    let output = sidecar.execute().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(*timed_out.lock().unwrap());
    assert_eq!(output.stdout, "started\n");
    assert_eq!(output.status.code, None);
    assert_eq!(output.status.signal, Some(9));
    assert_eq!(
        events.lock().unwrap().last().map(String::as_str),
        Some("close:terminated by signal 9")
    );
}

#[tokio::test]
async fn test_timeout_covers_background_jobs_holding_pipes() {
    init_tracing();
    let events = Events::default();
    let config = SidecarConfig::builder()
        .program("sh")
        .args(["-c", "echo A; sleep 5 &"])
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = Instant::now();
    let output = recorded(Sidecar::new(config).resolver(SystemResolver), &events)
        .execute()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(output.stdout, "A\n");

    let events = events.lock().unwrap();
    assert!(events.contains(&"error:Runtime process error: Process timed out after 300 ms".to_string()));
    assert!(events.last().is_some_and(|e| e.starts_with("close:")));
}

#[tokio::test]
async fn test_relay_to_console_formats_events() {
    let lines = Events::default();
    let console = Arc::new(capturing_console(&lines));

    let output = shell("echo hello; echo warning >&2")
        .relay_to(console.clone(), Channel::Info)
        .run(&console)
        .await
        .expect("sh should spawn");

    assert_eq!(output.stdout, "hello\n");
    let lines = lines.lock().unwrap();
    assert!(lines.contains(&"Info:stdout: hello".to_string()));
    assert!(lines.contains(&"Info:stderr: warning".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("Info:close: exit code 0"));
}

#[tokio::test]
async fn test_unsubscribed_events_still_complete() {
    init_tracing();
    let output = shell("echo quiet; echo loud >&2; exit 1")
        .execute()
        .await
        .unwrap();

    assert_eq!(output.stdout, "quiet\n");
    assert_eq!(output.stderr, "loud\n");
    assert_eq!(output.status, ExitInfo::from_code(1));
}

#[tokio::test]
async fn test_options_reach_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let options = SpawnOptions::from_json(serde_json::json!({
        "cwd": dir.path(),
        "env": { "SIDECAR_MODE": "relay" },
        "unused": true
    }))
    .unwrap();

    let output = Sidecar::sidecar("sh", ["-c", "echo $SIDECAR_MODE; pwd"], options)
        .resolver(SystemResolver)
        .execute()
        .await
        .unwrap();

    let mut lines = output.stdout.lines();
    assert_eq!(lines.next(), Some("relay"));
    let cwd = std::path::PathBuf::from(lines.next().unwrap());
    assert_eq!(
        cwd.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}
