use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;

use hn_frontpage::run::{RunPlan, Stop};
use hn_frontpage::source::HackerNewsSource;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    hn_frontpage::logging::init().context("init logging")?;

    let cli = hn_frontpage::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let plan = RunPlan::from_args(&cli.run, chrono::Utc::now()).context("plan run")?;
    let source = HackerNewsSource::new(plan.base_url.clone(), plan.request_timeout)
        .context("build title source")?;

    let cancel = CancellationToken::new();
    let triggers = hn_frontpage::run::spawn_cancel_triggers(cancel.clone(), plan.deadline);
    let result = hn_frontpage::run::run(&plan, Arc::new(source), &cancel).await;
    triggers.stop().await;

    match result {
        Ok(outcome) => {
            let code = ExitCode::from(outcome.exit_code());
            match outcome.stop {
                Stop::Complete => {
                    tracing::info!(fetched = outcome.fetched, total = outcome.total, "range complete");
                }
                Stop::Cancelled { date } => {
                    tracing::info!(%date, fetched = outcome.fetched, "stopped early (time limit or interrupt)");
                }
                Stop::FetchFailed { error } => {
                    let err = anyhow::Error::from(error).context("failed to add missing entries");
                    eprintln!("{err:#}");
                }
            }
            Ok(code)
        }
        Err(err) => {
            let code = ExitCode::from(err.exit_code());
            eprintln!("{:#}", anyhow::Error::from(err));
            Ok(code)
        }
    }
}
