//! `xtraq` binary entry point: parses the CLI, wires logging, and dispatches
//! to the orchestrator.

use std::path::Path;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use xtraq_cli::cli::{Cli, CommandArgs, Commands};
use xtraq_cli::exit_code::ExitCode;
use xtraq_cli::logging::{init_logging, LogConfig};
use xtraq_cli::orchestrator::{build, snapshot};
use xtraq_common::error::Error;
use xtraq_telemetry::TelemetryWriter;

fn main() {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start the tokio runtime");

    let code = runtime.block_on(dispatch(cli));
    std::process::exit(code.as_i32());
}

async fn dispatch(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Version => {
            println!("xtraq {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Success
        }
        Commands::Snapshot(args) => run_snapshot(&args).await,
        Commands::Build(args) => run_build(&args).await,
        Commands::Update => {
            println!("xtraq {}", env!("CARGO_PKG_VERSION"));
            println!("no update server configured; install a newer release manually");
            ExitCode::Success
        }
    }
}

async fn run_snapshot(args: &CommandArgs) -> ExitCode {
    init_logging(&LogConfig::from_flags(args.verbose, args.debug));
    let cancel = CancellationToken::new();
    spawn_ctrl_c_watch(cancel.clone());

    let overrides = args.to_overrides();
    match snapshot::run(&overrides, cancel.clone()).await {
        Ok(outcome) => {
            println!(
                "snapshot: {} procedures refreshed, {} unchanged on disk, {} queries issued (warm_run={})",
                outcome.summary.procedures_refreshed,
                outcome.summary.procedures_unchanged_on_disk,
                outcome.summary.queries_issued,
                outcome.summary.warm_run,
            );
            if args.telemetry {
                write_telemetry(&outcome.telemetry);
            }
            ExitCode::Success
        }
        Err(_) if cancel.is_cancelled() => ExitCode::Cancelled,
        Err(err) => report_failure(&err),
    }
}

async fn run_build(args: &CommandArgs) -> ExitCode {
    init_logging(&LogConfig::from_flags(args.verbose, args.debug));

    let overrides = args.to_overrides();
    match build::run(&overrides).await {
        Ok(outcome) => {
            println!(
                "build: {} files written, {} unchanged, {} optional artifacts removed",
                outcome.summary.written, outcome.summary.unchanged, outcome.summary.deleted_optional,
            );
            if args.telemetry {
                write_telemetry(&outcome.telemetry);
            }
            ExitCode::Success
        }
        Err(err) => report_failure(&err),
    }
}

fn report_failure(err: &Error) -> ExitCode {
    error!(code = err.code(), category = %err.category(), "{err}");
    ExitCode::from(err)
}

fn write_telemetry(telemetry: &xtraq_telemetry::RunTelemetry) {
    let writer = TelemetryWriter::new(Path::new("."));
    if let Err(err) = writer.write(telemetry) {
        warn!(%err, "failed to write run telemetry");
    }
}

fn spawn_ctrl_c_watch(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, draining in-flight work before aborting");
            cancel.cancel();
        }
    });
}
