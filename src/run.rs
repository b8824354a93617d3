use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cli::RunArgs;
use crate::dataset::Dataset;
use crate::entry_date::EntryDate;
use crate::error::Error;
use crate::pacer::{PacedFetcher, Pacing};
use crate::source::TitleSource;

/// Validated run parameters.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub output: PathBuf,
    pub start: EntryDate,
    pub end: EntryDate,
    pub pacing: Pacing,
    pub deadline: Option<Duration>,
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl RunPlan {
    pub fn from_args(args: &RunArgs, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let start = EntryDate::from_ymd(args.start_year, 1, 1)
            .ok_or_else(|| anyhow::anyhow!("--start-year out of range: {}", args.start_year))?;
        let end = match args.end {
            Some(end) => end,
            None => EntryDate::from_timestamp(&(now - TimeDelta::days(1))),
        };
        let pacing = Pacing::from_millis(args.min_wait_ms, args.max_wait_ms)
            .context("--min-wait-ms/--max-wait-ms")?;
        let deadline = (!args.no_deadline).then(|| Duration::from_secs(args.duration));
        let base_url = Url::parse(&args.base_url).context("parse --base-url")?;

        Ok(Self {
            output: PathBuf::from(&args.output),
            start,
            end,
            pacing,
            deadline,
            base_url,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        })
    }
}

#[derive(Debug)]
pub enum Stop {
    Complete,
    /// The deadline or an interrupt fired while `date` was pending.
    Cancelled { date: EntryDate },
    /// The title source failed; everything before it was still saved.
    FetchFailed { error: Error },
}

#[derive(Debug)]
pub struct RunOutcome {
    pub fetched: usize,
    pub total: usize,
    pub stop: Stop,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self.stop {
            Stop::Complete | Stop::Cancelled { .. } => 0,
            Stop::FetchFailed { .. } => 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to read dataset")]
    Load(#[source] Error),
    #[error("failed to save dataset")]
    Save(#[source] Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Load(_) => 10,
            Self::Save(_) => 30,
        }
    }
}

/// Loads the dataset, fills the missing days of the plan's range and saves it again.
///
/// A fetch failure or cancellation ends the filling early but the dataset is saved anyway.
pub async fn run(
    plan: &RunPlan,
    source: Arc<dyn TitleSource>,
    cancel: &CancellationToken,
) -> Result<RunOutcome, RunError> {
    tracing::info!(path = %plan.output.display(), "reading dataset");
    let mut dataset = Dataset::load(&plan.output).map_err(RunError::Load)?;
    let existing = dataset.len();

    tracing::info!(
        start = %plan.start,
        end = %plan.end,
        existing,
        "adding missing entries"
    );
    let mut fetcher = PacedFetcher::new(source, plan.pacing);
    let stop = match dataset
        .gap_fill(plan.start, plan.end, &mut fetcher, cancel)
        .await
    {
        Ok(_) => Stop::Complete,
        Err(Error::Cancelled { date }) => {
            tracing::info!(%date, "stopped before the range was complete; saving progress");
            Stop::Cancelled { date }
        }
        Err(error) => {
            tracing::warn!(
                error = &error as &(dyn std::error::Error + 'static),
                "failed to add missing entries; saving what we have"
            );
            Stop::FetchFailed { error }
        }
    };
    let fetched = dataset.len() - existing;

    tracing::info!(fetched, total = dataset.len(), "saving dataset");
    dataset.save().map_err(RunError::Save)?;
    tracing::info!("done");

    Ok(RunOutcome {
        fetched,
        total: dataset.len(),
        stop,
    })
}

/// Background task cancelling a run on its deadline or on Ctrl-C.
pub struct CancelTriggers {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CancelTriggers {
    /// Cancels the token and waits for the task to finish.
    ///
    /// A panic inside the task is logged rather than propagated.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::warn!(?err, "cancel trigger task failed");
        }
    }
}

/// Cancels `cancel` once `deadline` elapses or Ctrl-C arrives.
///
/// The task ends quietly if `cancel` is triggered by someone else first.
pub fn spawn_cancel_triggers(
    cancel: CancellationToken,
    deadline: Option<Duration>,
) -> CancelTriggers {
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        let expiry = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = &mut expiry => tracing::info!("run deadline reached"),
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => tracing::info!("interrupted"),
                Err(err) => {
                    tracing::warn!(?err, "cannot listen for ctrl-c; relying on the deadline");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = &mut expiry => tracing::info!("run deadline reached"),
                    }
                }
            },
        }

        cancel.cancel();
    });

    CancelTriggers {
        cancel: token,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone as _;
    use clap::Parser as _;

    use super::*;
    use crate::cli::Cli;
    use crate::title_row::TitleRow;

    struct DaySource {
        fail_on: Option<EntryDate>,
    }

    #[async_trait]
    impl TitleSource for DaySource {
        async fn get_titles(&self, date: EntryDate) -> anyhow::Result<TitleRow> {
            if self.fail_on == Some(date) {
                anyhow::bail!("unexpected number of titles: 29");
            }
            Ok(TitleRow::new(std::array::from_fn(|i| format!("{date}/{i}"))))
        }
    }

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["hn-frontpage"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv).run
    }

    fn date(s: &str) -> EntryDate {
        EntryDate::parse(s).expect("valid date")
    }

    fn plan(output: PathBuf, start: &str, end: &str) -> RunPlan {
        RunPlan {
            output,
            start: date(start),
            end: date(end),
            pacing: Pacing::none(),
            deadline: None,
            base_url: Url::parse("http://127.0.0.1/").expect("url"),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn plan_defaults_end_to_yesterday_in_utc() -> anyhow::Result<()> {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 1, 0, 30, 0)
            .single()
            .expect("timestamp");

        let plan = RunPlan::from_args(&args(&["--start-year", "2024"]), now)?;

        assert_eq!(plan.start, date("2024-01-01"));
        assert_eq!(plan.end, date("2025-02-28"));
        assert_eq!(plan.deadline, Some(Duration::from_secs(60)));
        Ok(())
    }

    #[test]
    fn plan_honours_explicit_end_and_no_deadline() -> anyhow::Result<()> {
        let plan = RunPlan::from_args(
            &args(&["--end", "2012-06-30", "--no-deadline"]),
            Utc::now(),
        )?;

        assert_eq!(plan.end, date("2012-06-30"));
        assert_eq!(plan.deadline, None);
        Ok(())
    }

    #[test]
    fn plan_rejects_inverted_wait_bounds() {
        let result = RunPlan::from_args(
            &args(&["--min-wait-ms", "500", "--max-wait-ms", "100"]),
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn complete_run_saves_the_whole_range() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let plan = plan(temp.path().join("titles.csv"), "2024-01-30", "2024-02-02");

        let outcome = run(
            &plan,
            Arc::new(DaySource { fail_on: None }),
            &CancellationToken::new(),
        )
        .await?;

        assert!(matches!(outcome.stop, Stop::Complete));
        assert_eq!((outcome.fetched, outcome.total), (4, 4));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(Dataset::load(&plan.output)?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_failure_still_saves_progress() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let plan = plan(temp.path().join("titles.csv"), "2024-01-30", "2024-02-02");

        let outcome = run(
            &plan,
            Arc::new(DaySource {
                fail_on: Some(date("2024-02-01")),
            }),
            &CancellationToken::new(),
        )
        .await?;

        assert!(matches!(outcome.stop, Stop::FetchFailed { .. }));
        assert_eq!(outcome.exit_code(), 20);
        assert_eq!(Dataset::load(&plan.output)?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_run_is_not_a_failure() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let plan = plan(temp.path().join("titles.csv"), "2024-01-30", "2024-02-02");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run(&plan, Arc::new(DaySource { fail_on: None }), &cancel).await?;

        assert!(matches!(outcome.stop, Stop::Cancelled { date } if date == plan.start));
        assert_eq!(outcome.exit_code(), 0);
        assert!(plan.output.exists());
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_dataset_is_a_load_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("titles.csv");
        std::fs::write(&path, "Date,Title 1\n")?;
        let plan = plan(path.clone(), "2024-01-01", "2024-01-01");

        let err = run(
            &plan,
            Arc::new(DaySource { fail_on: None }),
            &CancellationToken::new(),
        )
        .await
        .expect_err("bad header");

        assert!(matches!(err, RunError::Load(Error::Format { .. })));
        assert_eq!(err.exit_code(), 10);
        let message = format!("{:#}", anyhow::Error::new(err));
        assert!(message.starts_with("failed to read dataset: malformed dataset "));
        assert!(message.ends_with("unexpected header row: [\"Date\", \"Title 1\"]"));
        assert_eq!(std::fs::read_to_string(&path)?, "Date,Title 1\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_output_directory_is_a_save_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let plan = plan(
            temp.path().join("missing").join("titles.csv"),
            "2024-01-01",
            "2024-01-01",
        );

        let err = run(
            &plan,
            Arc::new(DaySource { fail_on: None }),
            &CancellationToken::new(),
        )
        .await
        .expect_err("no directory to save into");

        assert!(matches!(err, RunError::Save(Error::Io { op: "write", .. })));
        assert_eq!(err.exit_code(), 30);
        Ok(())
    }

    #[tokio::test]
    async fn deadline_cancels_the_token() {
        let cancel = CancellationToken::new();
        let triggers = spawn_cancel_triggers(cancel.clone(), Some(Duration::from_millis(20)));

        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("deadline fires");
        triggers.handle.await.expect("trigger task");
    }

    #[tokio::test]
    async fn stop_ends_a_pending_trigger_task() {
        let cancel = CancellationToken::new();
        let triggers = spawn_cancel_triggers(cancel.clone(), None);

        tokio::time::timeout(Duration::from_secs(5), triggers.stop())
            .await
            .expect("trigger task stops");
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn stop_survives_a_panicked_trigger_task() {
        let cancel = CancellationToken::new();
        let triggers = CancelTriggers {
            cancel: cancel.clone(),
            handle: tokio::spawn(async { panic!("trigger task blew up") }),
        };

        triggers.stop().await;
        assert!(cancel.is_cancelled());
    }
}
