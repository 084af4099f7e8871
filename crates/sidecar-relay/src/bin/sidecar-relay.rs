//! Desktop bootstrap: relay console output into tracing, then run the
//! bundled helper once and log everything it prints.

use clap::Parser;
use sidecar_relay::{
    BundledResolver, Channel, Console, LoggingConfig, RelaySink, Sidecar, SidecarConfig,
    SpawnOptions, TracingSink, init_tracing,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sidecar-relay",
    version,
    about = "Run a bundled sidecar and relay its output into the log stream"
)]
struct Cli {
    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    filter: String,

    /// Kill the sidecar after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory bundled programs are resolved against (default: next to this binary)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Also look for `<program>-<suffix>`, e.g. a target triple
    #[arg(long)]
    platform_suffix: Option<String>,

    /// Bundled program to run
    #[arg(default_value = "./bin/horsed")]
    program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, default_value = "--help")]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&LoggingConfig {
        default_filter: cli.filter.clone(),
        json: cli.json,
    })?;

    let console = Arc::new(Console::new());
    let sink = RelaySink::spawn(TracingSink);
    console.forward_all(&sink);

    console.info("start");

    let mut resolver = match cli.base_dir {
        Some(dir) => BundledResolver::new(dir),
        None => BundledResolver::from_current_exe()?,
    };
    if let Some(suffix) = cli.platform_suffix {
        resolver = resolver.with_platform_suffix(suffix);
    }

    let config = SidecarConfig::builder()
        .program(cli.program)
        .args(cli.args)
        .options(SpawnOptions {
            timeout_ms: cli.timeout_ms,
            ..Default::default()
        })
        .build()?;

    let sidecar = Sidecar::new(config)
        .resolver(resolver)
        .relay_to(console.clone(), Channel::Info);

    if let Some(output) = sidecar.run(&console).await {
        console.info(&output.stdout);
        console.info(&output.stderr);
    }

    sink.flush().await;
    Ok(())
}
