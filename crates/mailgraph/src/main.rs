//! `mailgraph` - Microsoft Graph mail retrieval
//!
//! Acquires a token for the configured application, pages through the
//! configured endpoint and writes the validated messages as JSON.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mailgraph_core::{Config, Error, RunOutcome, StopReason, config};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

const DEFAULT_FILTER: &str = "mailgraph=info,mailgraph_core=info,mailgraph_oauth=info";
const VERBOSE_FILTER: &str = "mailgraph=debug,mailgraph_core=debug,mailgraph_oauth=debug";

/// Exit status after an interrupt that could not be handled gracefully.
const INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(&cli.configs) {
        Ok(config) => config,
        Err(e) => {
            init_logging(None, cli.verbose);
            return fail(&Error::from(e).into());
        }
    };
    init_logging(config.log_filter.as_deref(), cli.verbose);

    if cli.dump {
        print!("{}", config.redacted());
        return ExitCode::SUCCESS;
    }

    match execute(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn init_logging(configured: Option<&str>, verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(env.as_deref(), configured, verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Picks the first usable filter: `RUST_LOG`, then the configured filter,
/// then the built-in default.
fn filter_directives<'a>(
    env: Option<&'a str>,
    configured: Option<&'a str>,
    verbose: bool,
) -> &'a str {
    [env, configured]
        .into_iter()
        .flatten()
        .filter(|directives| !directives.trim().is_empty())
        .find(|directives| EnvFilter::try_new(directives).is_ok())
        .unwrap_or(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
}

fn fail(error: &anyhow::Error) -> ExitCode {
    eprintln!("{}", failure_message(error));
    ExitCode::FAILURE
}

fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<Error>() {
        Some(run_error) => format!("mailgraph: {} failed: {run_error}", run_error.stage()),
        None => format!("mailgraph: {error:#}"),
    }
}

fn execute(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        let interrupts = tokio::spawn(watch_interrupts(cancel.clone()));

        let result = retrieve(cli, config, &cancel).await;
        // Retrieval is over; from here an interrupt exits immediately.
        cancel.cancel();
        let written = match result {
            Ok(outcome) => write_output(cli.output.clone(), outcome).await,
            Err(e) => Err(e),
        };

        interrupts.abort();
        written
    })
}

async fn retrieve(
    cli: &Cli,
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<RunOutcome> {
    debug!(?config, "Configuration loaded");

    let outcome = mailgraph_core::run(config, cli.run_options(), cancel).await?;

    for error in &outcome.validation_errors {
        warn!("{error}");
    }
    match outcome.stop {
        StopReason::Exhausted => debug!(pages = outcome.pages, "No further pages"),
        StopReason::PageLimit => info!(
            pages = outcome.pages,
            "Page limit reached; more pages are available"
        ),
        StopReason::Cancelled => warn!(
            records = outcome.records.len(),
            "Interrupted; keeping records received so far"
        ),
    }
    Ok(outcome)
}

/// Writes off the runtime thread so interrupts are still observed.
async fn write_output(path: Option<PathBuf>, outcome: RunOutcome) -> anyhow::Result<()> {
    let written = tokio::task::spawn_blocking(move || match &path {
        Some(path) => outcome.records.write_json(path).map(|()| {
            info!(records = outcome.records.len(), path = %path.display(), "Wrote output");
        }),
        None => outcome.records.print(),
    })
    .await
    .context("output task failed")?;

    written.map_err(Error::from)?;
    Ok(())
}

/// The first interrupt cancels retrieval; any later one, or one arriving
/// after retrieval has finished, exits the process.
async fn watch_interrupts(cancel: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if cancel.is_cancelled() {
            warn!("Interrupted");
            std::process::exit(INTERRUPTED);
        }
        info!("Interrupt received, stopping");
        cancel.cancel();
    }
}
