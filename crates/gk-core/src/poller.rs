//! Long-poll loop: owns the cursor and the retry state.
//!
//! One fetch at a time, events dispatched one at a time in ascending id order.
//! A poll timeout is an empty success; any other fetch failure is transient
//! and retried with linear backoff until `retry_limit` consecutive failures.

use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::{
    config::PollConfig,
    ports::{EventHandler, EventSource, PollOutcome, PollRequest, ALLOWED_UPDATES},
    Error, Result,
};

/// Consecutive transient failures and the backoff applied after the last one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryState {
    pub failures: u32,
    pub last_backoff: Duration,
}

impl RetryState {
    /// Count one more failure and return the backoff to apply (`failures * step`).
    pub fn record_failure(&mut self, step: Duration) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.last_backoff = step.saturating_mul(self.failures);
        self.last_backoff
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What a single iteration of the loop did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStep {
    /// Fetch succeeded; `dispatched` fresh events were handed to the handler.
    Processed { dispatched: usize },
    /// Nothing arrived within the window.
    TimedOut,
    /// Fetch failed and the loop slept `backoff` before returning.
    Retried { attempt: u32, backoff: Duration },
}

pub struct PollController<S> {
    source: S,
    cfg: PollConfig,
    cursor: i64,
    retry: RetryState,
}

impl<S: EventSource> PollController<S> {
    pub fn new(source: S, cfg: PollConfig) -> Self {
        Self {
            source,
            cfg,
            cursor: 0,
            retry: RetryState::default(),
        }
    }

    /// Next unconsumed event id.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry
    }

    /// Poll forever. Only returns once `retry_limit` consecutive fetches failed.
    pub async fn run(&mut self, handler: &dyn EventHandler) -> Result<()> {
        loop {
            self.poll_once(handler).await?;
        }
    }

    pub async fn poll_once(&mut self, handler: &dyn EventHandler) -> Result<PollStep> {
        tracing::debug!(offset = self.cursor, "fetching updates");

        let req = PollRequest {
            offset: self.cursor,
            timeout: self.cfg.poll_timeout,
            allowed: ALLOWED_UPDATES,
        };
        let fetched = match timeout(self.cfg.request_timeout, self.source.fetch(req)).await {
            Ok(res) => res,
            Err(_) => Ok(PollOutcome::TimedOut),
        };

        match fetched {
            Ok(PollOutcome::TimedOut) => {
                tracing::debug!("polling timeout, next poll");
                Ok(PollStep::TimedOut)
            }
            Ok(PollOutcome::Batch(events)) => {
                self.retry.reset();
                tracing::debug!(n_updates = events.len(), "got updates");

                let mut dispatched = 0;
                for event in &events {
                    if event.id < self.cursor {
                        tracing::debug!(
                            update_id = event.id,
                            offset = self.cursor,
                            "skipping already consumed update"
                        );
                        continue;
                    }
                    self.cursor = self.cursor.max(event.id.saturating_add(1));
                    handler.handle(event).await;
                    dispatched += 1;
                }
                Ok(PollStep::Processed { dispatched })
            }
            Err(e) => {
                let backoff = self.retry.record_failure(self.cfg.backoff_step);
                let attempt = self.retry.failures;
                if attempt >= self.cfg.retry_limit {
                    tracing::error!(
                        error = %e,
                        retry_attempt = attempt,
                        retry_limit = self.cfg.retry_limit,
                        "getting updates failed too many times, giving up"
                    );
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }

                tracing::error!(
                    error = %e,
                    sleep = ?backoff,
                    retry_attempt = attempt,
                    "getting updates, sleeping and retrying"
                );
                sleep(backoff).await;
                Ok(PollStep::Retried { attempt, backoff })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::domain::Event;

    /// Replays scripted fetch results; an exhausted script hangs forever.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<PollOutcome>>>,
        requests: Mutex<Vec<PollRequest>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<PollOutcome>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn fetch(&self, req: PollRequest) -> Result<PollOutcome> {
            self.requests.lock().unwrap().push(req);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(res) => res,
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.id);
        }
    }

    fn batch(ids: &[i64]) -> Result<PollOutcome> {
        Ok(PollOutcome::Batch(ids.iter().map(|id| Event::other(*id)).collect()))
    }

    fn failure() -> Result<PollOutcome> {
        Err(Error::External("connection reset".to_string()))
    }

    fn cfg(retry_limit: u32) -> PollConfig {
        PollConfig {
            retry_limit,
            ..PollConfig::default()
        }
    }

    #[tokio::test]
    async fn cursor_is_one_past_highest_id() {
        let source = ScriptedSource::new(vec![batch(&[5]), batch(&[3, 9, 10])]);
        let mut ctl = PollController::new(source, cfg(10));
        let rec = Recorder::default();

        assert_eq!(
            ctl.poll_once(&rec).await.unwrap(),
            PollStep::Processed { dispatched: 1 }
        );
        assert_eq!(ctl.cursor(), 6);

        // id 3 is below the cursor and must not be dispatched again.
        assert_eq!(
            ctl.poll_once(&rec).await.unwrap(),
            PollStep::Processed { dispatched: 2 }
        );
        assert_eq!(ctl.cursor(), 11);
        assert_eq!(*rec.seen.lock().unwrap(), vec![5, 9, 10]);
    }

    #[tokio::test]
    async fn requests_carry_cursor_and_window() {
        let source = ScriptedSource::new(vec![batch(&[3]), batch(&[7])]);
        let mut ctl = PollController::new(source, cfg(10));
        let rec = Recorder::default();

        ctl.poll_once(&rec).await.unwrap();
        ctl.poll_once(&rec).await.unwrap();
        assert_eq!(ctl.cursor(), 8);

        let reqs = ctl.source.requests.lock().unwrap();
        assert_eq!(reqs[0].offset, 0);
        assert_eq!(reqs[1].offset, 4);
        assert_eq!(reqs[1].timeout, Duration::from_secs(240));
        assert_eq!(reqs[1].allowed, &["chat_member"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_neither_sleeps_nor_counts() {
        let source = ScriptedSource::new(vec![failure(), Ok(PollOutcome::TimedOut)]);
        let mut ctl = PollController::new(source, cfg(10));
        let rec = Recorder::default();

        ctl.poll_once(&rec).await.unwrap();
        assert_eq!(ctl.retry_state().failures, 1);

        let start = Instant::now();
        assert_eq!(ctl.poll_once(&rec).await.unwrap(), PollStep::TimedOut);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(ctl.retry_state().failures, 1);
        assert_eq!(ctl.cursor(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn request_deadline_counts_as_timeout() {
        let source = ScriptedSource::new(vec![]);
        let mut ctl = PollController::new(source, cfg(10));
        let rec = Recorder::default();

        let start = Instant::now();
        assert_eq!(ctl.poll_once(&rec).await.unwrap(), PollStep::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
        assert_eq!(ctl.retry_state().failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn linear_backoff_then_reset_on_success() {
        let source = ScriptedSource::new(vec![failure(), failure(), failure(), batch(&[])]);
        let mut ctl = PollController::new(source, cfg(4));
        let rec = Recorder::default();

        let start = Instant::now();
        for n in 1..=3u32 {
            let step = ctl.poll_once(&rec).await.unwrap();
            assert_eq!(
                step,
                PollStep::Retried {
                    attempt: n,
                    backoff: Duration::from_secs(u64::from(n)),
                }
            );
        }
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2 + 3));

        assert_eq!(
            ctl.poll_once(&rec).await.unwrap(),
            PollStep::Processed { dispatched: 0 }
        );
        assert_eq!(ctl.retry_state(), RetryState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn aborts_when_retry_limit_reached() {
        let source = ScriptedSource::new((0..3).map(|_| failure()).collect());
        let mut ctl = PollController::new(source, cfg(3));
        let rec = Recorder::default();

        let start = Instant::now();
        let err = ctl.run(&rec).await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        // Slept after failures 1 and 2 only.
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2));
        assert!(rec.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn retry_state_tracks_backoff() {
        let mut st = RetryState::default();
        assert_eq!(st.record_failure(Duration::from_millis(500)), Duration::from_millis(500));
        assert_eq!(st.record_failure(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(st.failures, 2);
        st.reset();
        assert_eq!(st, RetryState::default());
    }
}
