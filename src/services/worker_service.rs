use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::models::queue_job::{JobPayload, QueueJob};
use crate::services::queue_service::{JobQueue, RetryPolicy};
use crate::AppState;

/// Jobs ACTIVE for longer than this are assumed orphaned by a crashed worker.
pub const STALL_THRESHOLD_MINUTES: i64 = 15;

/// Pulls due jobs off the queue and runs them against the app's services.
#[derive(Clone)]
pub struct QueueWorker {
    queue: Arc<dyn JobQueue>,
    retry: RetryPolicy,
}

impl QueueWorker {
    pub fn new(queue: Arc<dyn JobQueue>, retry: RetryPolicy) -> Self {
        Self { queue, retry }
    }

    pub async fn recover_stalled(&self) -> Result<u64> {
        let cutoff = Utc::now() - Duration::minutes(STALL_THRESHOLD_MINUTES);
        let recovered = self.queue.recover_stalled(cutoff).await?;
        if recovered > 0 {
            tracing::warn!(recovered, "Returned stalled jobs to the queue");
        }
        Ok(recovered)
    }

    /// Runs at most one due job. `Ok(false)` means the queue was idle.
    pub async fn run_once(&self, state: &AppState) -> Result<bool> {
        self.run_once_at(state, Utc::now()).await
    }

    pub async fn run_once_at(&self, state: &AppState, now: DateTime<Utc>) -> Result<bool> {
        let Some(job) = self.queue.claim_due(now).await? else {
            return Ok(false);
        };
        tracing::info!(job_id = %job.id, kind = %job.kind, attempt = job.attempts, "Job active");

        match execute(state, &job.payload).await {
            Ok(()) => {
                self.queue.complete(job.id).await?;
                tracing::info!(job_id = %job.id, kind = %job.kind, "Job completed");
            }
            Err(e) => self.handle_failure(state, &job, &e.to_string(), now).await?,
        }
        Ok(true)
    }

    async fn handle_failure(
        &self,
        state: &AppState,
        job: &QueueJob,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if job.attempts < job.max_attempts {
            let retry_at = self.retry.next_retry_at(now, job.attempts);
            self.queue.fail(job.id, error, Some(retry_at)).await?;
            tracing::warn!(
                job_id = %job.id,
                kind = %job.kind,
                attempt = job.attempts,
                %retry_at,
                error,
                "Job failed; retry scheduled"
            );
            return Ok(());
        }

        self.queue.fail(job.id, error, None).await?;
        tracing::error!(
            job_id = %job.id,
            kind = %job.kind,
            attempts = job.attempts,
            error,
            "Job failed permanently"
        );
        state.mail_service.alert_operator(job, error).await;
        Ok(())
    }
}

async fn execute(state: &AppState, payload: &JobPayload) -> Result<()> {
    match payload {
        JobPayload::SendNow(mail) => {
            state.mail_service.deliver(payload).await?;
            if let Some(event_id) = mail.event_id {
                state.calendar_event_service.mark_completed(event_id).await;
            }
            Ok(())
        }
        JobPayload::SendOtp(_) | JobPayload::SendQueued(_) | JobPayload::Welcome(_) => {
            state.mail_service.deliver(payload).await
        }
        JobPayload::ExtractInfo(request) => {
            state.extraction_service.process(request).await.map(|_| ())
        }
        JobPayload::EventFanOut(request) => {
            state.calendar_event_service.fan_out(request).await.map(|_| ())
        }
    }
}
