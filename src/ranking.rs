//! Ranking poller - leaderboard refreshed from the backend on a fixed interval
//!
//! Fetches immediately, then on every interval boundary. Each successful
//! fetch replaces the published board wholesale; a failed fetch keeps the
//! previous entries and records the error. Fetches never overlap: boundaries
//! that pass while a fetch is in flight are skipped and the schedule resyncs
//! to the next one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::ApiError;
use crate::model::{Metric, RankingEntry};
use crate::quality::{BandTable, Color};

/// Anything that can produce a freshly computed ranking list
pub trait RankingSource: Send + Sync + 'static {
    fn fetch_ranking(
        &self,
        metric: Metric,
    ) -> impl Future<Output = Result<Vec<RankingEntry>, ApiError>> + Send;
}

/// What the leaderboard displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingBoard {
    pub metric: Metric,
    pub entries: Vec<RankingEntry>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Set when the latest fetch failed; entries are then the last good list
    pub last_error: Option<String>,
}

impl RankingBoard {
    pub fn empty(metric: Metric) -> Self {
        Self {
            metric,
            entries: Vec::new(),
            updated_at: None,
            last_error: None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.last_error.is_some()
    }

    /// First `n` entries (the board chart shows 10)
    pub fn top(&self, n: usize) -> &[RankingEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Entries paired with their band color
    pub fn colored<'a>(&'a self, table: &'a BandTable) -> Vec<(&'a RankingEntry, Color)> {
        self.entries.iter().map(|e| (e, table.color_for(e.value))).collect()
    }

    fn replace(&mut self, mut entries: Vec<RankingEntry>, reverse: bool) {
        if reverse {
            entries.reverse();
        }
        self.entries = entries;
        self.updated_at = Some(Utc::now());
        self.last_error = None;
    }
}

#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub metric: Metric,
    pub interval: Duration,
    /// Display the delivered list back to front
    pub reverse: bool,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Air,
            interval: Duration::from_secs(30),
            reverse: true,
        }
    }
}

pub struct RankingPoller;

impl RankingPoller {
    /// Start polling on a background task. Must be called inside a tokio runtime.
    pub fn spawn<S: RankingSource>(source: S, options: PollerOptions) -> PollerHandle {
        let (board_tx, board_rx) = watch::channel(RankingBoard::empty(options.metric));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = options.interval.max(Duration::from_millis(1));

        tracing::info!(
            metric = options.metric.as_str(),
            interval_ms = period.as_millis() as u64,
            "Ranking poller started"
        );

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut next = start;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    () = tokio::time::sleep_until(next) => {}
                }

                // A result that arrives after stop is dropped with the future
                let result = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    r = source.fetch_ranking(options.metric) => r,
                };

                match result {
                    Ok(entries) => {
                        tracing::debug!("Ranking fetched: {} entries", entries.len());
                        board_tx.send_modify(|b| b.replace(entries, options.reverse));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Ranking fetch failed, keeping previous list");
                        board_tx.send_modify(|b| b.last_error = Some(e.to_string()));
                    }
                }

                next = next_boundary(start, period, Instant::now()).max(next + period);
            }

            tracing::info!(metric = options.metric.as_str(), "Ranking poller stopped");
        });

        PollerHandle {
            stop: Some(stop_tx),
            task: Some(task),
            board: board_rx,
        }
    }
}

/// First `start + k * period` at or after `now`
fn next_boundary(start: Instant, period: Duration, now: Instant) -> Instant {
    let elapsed = now.saturating_duration_since(start).as_nanos();
    let period_ns = period.as_nanos();
    let k = elapsed.div_ceil(period_ns);
    start + Duration::from_nanos((k * period_ns).min(u64::MAX as u128) as u64)
}

/// Stop handle and subscription point for a running poller.
///
/// Dropping the handle aborts the poller.
pub struct PollerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    board: watch::Receiver<RankingBoard>,
}

impl PollerHandle {
    pub fn board(&self) -> RankingBoard {
        self.board.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RankingBoard> {
        self.board.clone()
    }

    /// Stop polling and wait for the task to finish.
    ///
    /// Once this returns no further board updates happen. Any fetch in
    /// flight is cancelled and its result discarded.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            // Err means the task already ended
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Ranking poller task panicked");
                }
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
