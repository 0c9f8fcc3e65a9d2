//! Fixed-interval polling of translation job progress
//!
//! The poller is a small state machine: it starts in [`PollState::Polling`]
//! and leaves it exactly once, for `Completed`, `Failed` or `Cancelled`.
//! Requests are issued one at a time; the next tick is only awaited after the
//! previous response arrived, so completions can never be observed out of
//! order.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::errors::{Result, SyncError};
use crate::core::models::JobProgress;

/// Something that can report a job's progress
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self, job_id: &str) -> Result<JobProgress>;
}

#[async_trait]
impl<T: ProgressSource + ?Sized> ProgressSource for Arc<T> {
    async fn fetch_progress(&self, job_id: &str) -> Result<JobProgress> {
        (**self).fetch_progress(job_id).await
    }
}

/// Receives progress updates from the poller
pub trait ProgressSink: Send {
    fn on_progress(&mut self, completed: u64, total: u64);

    /// Called once when the poller leaves `Polling`
    fn on_finished(&mut self, _state: PollState, _error: Option<&SyncError>) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, u64) + Send,
{
    fn on_progress(&mut self, completed: u64, total: u64) {
        self(completed, total)
    }
}

/// Sink that writes progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&mut self, completed: u64, total: u64) {
        info!("Translation progress: {}/{}", completed, total);
    }

    fn on_finished(&mut self, state: PollState, error: Option<&SyncError>) {
        match error {
            Some(e) => warn!("Polling {}: {}", state, e),
            None => info!("Polling {}", state),
        }
    }
}

/// Poller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Polling => write!(f, "polling"),
            PollState::Completed => write!(f, "completed"),
            PollState::Failed => write!(f, "failed"),
            PollState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a successful poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(JobProgress),
    Cancelled { last: Option<JobProgress> },
}

/// Polling cadence and bounds
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_duration: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
            max_duration: Some(Duration::from_secs(3600)),
        }
    }
}

/// Stops a running poll from another task
#[derive(Debug, Clone)]
pub struct PollCancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl PollCancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

impl Default for PollCancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a job until its completed count reaches its total
pub struct ProgressPoller<S> {
    source: S,
    config: PollerConfig,
    state: PollState,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl<S> fmt::Debug for ProgressPoller<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressPoller")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: ProgressSource> ProgressPoller<S> {
    pub fn new(source: S, config: PollerConfig) -> Self {
        Self::with_cancel(source, config, PollCancelHandle::new())
    }

    /// Create a poller that stops when `cancel` is triggered
    pub fn with_cancel(source: S, config: PollerConfig, cancel: PollCancelHandle) -> Self {
        let cancel_rx = cancel.tx.subscribe();
        Self {
            source,
            config,
            state: PollState::Polling,
            cancel_tx: cancel.tx,
            cancel_rx,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn cancel_handle(&self) -> PollCancelHandle {
        PollCancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    fn finish(
        &mut self,
        state: PollState,
        sink: &mut dyn ProgressSink,
        error: Option<&SyncError>,
    ) {
        self.state = state;
        sink.on_finished(state, error);
    }

    fn fail(&mut self, sink: &mut dyn ProgressSink, error: SyncError) -> Result<PollOutcome> {
        self.finish(PollState::Failed, sink, Some(&error));
        Err(error)
    }

    /// Poll `job_id` until it completes, fails, hits a bound, or is cancelled.
    ///
    /// The first request goes out immediately. A poller runs once; calling this
    /// again after it left `Polling` is a validation error.
    pub async fn poll_until_done(
        &mut self,
        job_id: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<PollOutcome> {
        if self.state != PollState::Polling {
            return Err(SyncError::validation(format!(
                "poller already {}",
                self.state
            )));
        }

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts: u32 = 0;
        let mut last = None;

        loop {
            if self.is_cancelled() {
                self.finish(PollState::Cancelled, sink, None);
                return Ok(PollOutcome::Cancelled { last });
            }

            tokio::select! {
                biased;
                _ = self.cancel_rx.changed() => continue,
                _ = ticker.tick() => {}
            }

            attempts += 1;
            debug!("Polling job {} (attempt {})", job_id, attempts);
            let result = self.source.fetch_progress(job_id).await;

            if self.is_cancelled() {
                debug!("Ignoring progress response for cancelled job {}", job_id);
                self.finish(PollState::Cancelled, sink, None);
                return Ok(PollOutcome::Cancelled { last });
            }

            let progress = match result {
                Ok(progress) => progress,
                Err(e) => return self.fail(sink, e),
            };

            last = Some(progress);
            sink.on_progress(progress.translations_completed, progress.translations_total);

            if progress.is_complete() {
                self.finish(PollState::Completed, sink, None);
                return Ok(PollOutcome::Completed(progress));
            }

            let attempts_exhausted = self.config.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self
                .config
                .max_duration
                .is_some_and(|max| started.elapsed() >= max);
            if attempts_exhausted || out_of_time {
                return self.fail(sink, SyncError::PollLimitExceeded { attempts });
            }
        }
    }
}
