use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::queue_job::{JobKind, JobPayload, QueueJob};

#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Earliest time a worker may pick the job up. `None` means now.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Overrides the queue's default attempt bound.
    pub max_attempts: Option<u32>,
}

impl EnqueueOptions {
    pub fn at(scheduled_at: DateTime<Utc>) -> Self {
        Self {
            scheduled_at: Some(scheduled_at),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: Uuid,
    pub kind: JobKind,
    pub scheduled_at: DateTime<Utc>,
}

/// Durable at-least-once job queue.
///
/// Producers only call the `enqueue*` methods; the rest is the worker side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, payload: JobPayload, options: EnqueueOptions) -> Result<JobHandle>;

    /// Enqueues every job or none of them.
    async fn enqueue_batch(&self, jobs: Vec<(JobPayload, EnqueueOptions)>) -> Result<Vec<JobHandle>>;

    /// Claims the oldest pending job due at `now`, moving it to ACTIVE and
    /// bumping its attempt count.
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Option<QueueJob>>;

    async fn complete(&self, id: Uuid) -> Result<()>;

    /// Records a failed attempt. With `retry_at` the job goes back to
    /// PENDING for that time, otherwise it is FAILED for good.
    async fn fail(&self, id: Uuid, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<QueueJob>>;

    /// Returns jobs stuck in ACTIVE since before `started_before` to PENDING.
    async fn recover_stalled(&self, started_before: DateTime<Utc>) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_secs: i64,
    pub max_delay_secs: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_secs: 30,
            max_delay_secs: 3600,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try after `attempt` failed tries (1-based).
    pub fn backoff(&self, attempt: i32) -> Duration {
        let exp = (attempt - 1).clamp(0, 20) as u32;
        let secs = self
            .base_delay_secs
            .saturating_mul(2_i64.saturating_pow(exp))
            .min(self.max_delay_secs);
        Duration::seconds(secs)
    }

    pub fn next_retry_at(&self, now: DateTime<Utc>, attempt: i32) -> DateTime<Utc> {
        let jitter = Duration::milliseconds(rand::thread_rng().gen_range(0..=1000));
        now + self.backoff(attempt) + jitter
    }
}
