//! The job consumption loop.
//!
//! The loop is a small state machine: it blocks on the queue (`Waiting`),
//! hands each payload to the [`JobProcessor`] (`Processing`), and pauses
//! after failures according to a [`RetryPolicy`] (`Backoff` for an
//! unreachable queue, a shorter pause for anything else). No failure ends
//! the loop.

use std::time::Duration;
use strum::{Display, IntoStaticStr};
use tokio::time::sleep;

use crate::models::job::CountJob;
use crate::services::detector::Detector;
use crate::services::processor::{JobProcessor, Outcome, ProcessError};
use crate::services::queue::{JobQueue, QueueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    Waiting,
    Processing,
    Backoff,
}

/// Failures the loop recovers from, each with a fixed pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The queue could not be reached
    Connectivity,
    /// The payload was not a job object
    MalformedPayload,
    /// Detector, serialization or any other queue failure
    Unexpected,
}

impl From<&QueueError> for FailureKind {
    fn from(err: &QueueError) -> Self {
        if err.is_connectivity() {
            FailureKind::Connectivity
        } else {
            FailureKind::Unexpected
        }
    }
}

impl From<&ProcessError> for FailureKind {
    fn from(err: &ProcessError) -> Self {
        match err {
            ProcessError::Publish(queue_err) => queue_err.into(),
            ProcessError::Detector(_) | ProcessError::Serialize(_) => FailureKind::Unexpected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connectivity_backoff: Duration,
    pub error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connectivity_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::Connectivity => self.connectivity_backoff,
            FailureKind::MalformedPayload => Duration::ZERO,
            FailureKind::Unexpected => self.error_backoff,
        }
    }
}

/// What a single pass through the loop did.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    /// Dequeue timed out with nothing to do
    Idle,
    Completed(Outcome),
    Recovered { kind: FailureKind, delay: Duration },
}

/// Pulls jobs one at a time and never gives up.
pub struct ConsumerLoop<Q, D> {
    queue: Q,
    processor: JobProcessor<D>,
    policy: RetryPolicy,
    dequeue_timeout: Duration,
    state: LoopState,
}

impl<Q, D> ConsumerLoop<Q, D>
where
    Q: JobQueue,
    D: Detector,
{
    pub fn new(
        queue: Q,
        processor: JobProcessor<D>,
        policy: RetryPolicy,
        dequeue_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            processor,
            policy,
            dequeue_timeout,
            state: LoopState::Waiting,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Run until the process is stopped.
    pub async fn run(&mut self) {
        tracing::info!(
            dequeue_timeout_secs = self.dequeue_timeout.as_secs(),
            results_key = %self.processor.results_key(),
            "Consumer loop started"
        );
        loop {
            let cycle = self.tick().await;
            tracing::trace!(cycle = ?cycle, "Cycle finished");
        }
    }

    /// One dequeue and, if a job arrived, its processing. Always ends back in
    /// `Waiting`.
    pub async fn tick(&mut self) -> Cycle {
        self.state = LoopState::Waiting;
        let payload = match self.queue.dequeue(self.dequeue_timeout).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Cycle::Idle,
            Err(e) => {
                let kind = FailureKind::from(&e);
                tracing::error!(error = %e, kind = %kind, "Failed to dequeue job");
                return self.recover(kind).await;
            }
        };

        self.state = LoopState::Processing;
        let job = match CountJob::from_payload(&payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    payload = %payload_preview(&payload),
                    payload_len = payload.len(),
                    "Invalid JSON in job, discarding"
                );
                return self.recover(FailureKind::MalformedPayload).await;
            }
        };

        match self.processor.process(&mut self.queue, job).await {
            Ok(outcome) => {
                self.state = LoopState::Waiting;
                Cycle::Completed(outcome)
            }
            Err(e) => {
                let kind = FailureKind::from(&e);
                tracing::error!(error = %e, kind = %kind, "Job processing failed");
                self.recover(kind).await
            }
        }
    }

    async fn recover(&mut self, kind: FailureKind) -> Cycle {
        let delay = self.policy.delay_for(kind);
        let label: &'static str = kind.into();
        metrics::counter!("people_counter_failures_total", "kind" => label).increment(1);

        if kind == FailureKind::Connectivity {
            self.state = LoopState::Backoff;
            tracing::warn!(
                backoff_ms = delay.as_millis() as u64,
                "Redis connection lost, backing off"
            );
        }
        if !delay.is_zero() {
            sleep(delay).await;
        }

        self.state = LoopState::Waiting;
        Cycle::Recovered { kind, delay }
    }
}

const PAYLOAD_PREVIEW_CHARS: usize = 256;

/// Leading characters of a payload, bounded for logging.
fn payload_preview(payload: &str) -> &str {
    match payload.char_indices().nth(PAYLOAD_PREVIEW_CHARS) {
        Some((end, _)) => &payload[..end],
        None => payload,
    }
}
