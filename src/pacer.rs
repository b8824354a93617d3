use std::sync::Arc;
use std::time::Duration;

use rand::Rng as _;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::entry_date::EntryDate;
use crate::error::{Error, Result};
use crate::source::TitleSource;
use crate::title_row::TitleRow;

/// Wait bounds between consecutive title-source calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> anyhow::Result<Self> {
        if min > max {
            anyhow::bail!(
                "minimum wait ({} ms) must not exceed maximum wait ({} ms)",
                min.as_millis(),
                max.as_millis()
            );
        }
        Ok(Self { min, max })
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> anyhow::Result<Self> {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Uniform draw from `[min, max)`; exactly `min` when the bounds coincide.
    fn draw(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::rng().random_range(self.min..self.max)
    }
}

/// Serialises calls to a [`TitleSource`], spacing them by a jittered interval.
///
/// One fetcher owns the pacing state for a run; it is not meant to be shared.
pub struct PacedFetcher {
    source: Arc<dyn TitleSource>,
    pacing: Pacing,
    last_call: Option<Instant>,
}

impl PacedFetcher {
    pub fn new(source: Arc<dyn TitleSource>, pacing: Pacing) -> Self {
        Self {
            source,
            pacing,
            last_call: None,
        }
    }

    pub async fn fetch_titles(
        &mut self,
        date: EntryDate,
        cancel: &CancellationToken,
    ) -> Result<TitleRow> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { date });
        }

        let target = self.pacing.draw();
        if let Some(last_call) = self.last_call {
            let elapsed = last_call.elapsed();
            if elapsed < target {
                let remaining = target - elapsed;
                tracing::debug!(%date, wait_ms = remaining.as_millis() as u64, "waiting before next query");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled { date }),
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }
        self.last_call = Some(Instant::now());

        tracing::info!(%date, "querying front page");
        self.source
            .get_titles(date)
            .await
            .map_err(|source| Error::Source { date, source })
    }
}
