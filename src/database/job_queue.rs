use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::queue_job::{JobKind, JobPayload, JobState, QueueJob};
use crate::services::queue_service::{EnqueueOptions, JobHandle, JobQueue};

const JOB_COLUMNS: &str = "id, kind, payload, state, attempts, max_attempts, scheduled_at, \
     last_error, created_at, started_at, finished_at";

/// Queue backed by the `queue_jobs` table.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    default_max_attempts: u32,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, default_max_attempts: u32) -> Self {
        Self {
            pool,
            default_max_attempts: default_max_attempts.max(1),
        }
    }

    async fn insert_job(
        &self,
        executor: impl PgExecutor<'_>,
        payload: JobPayload,
        options: EnqueueOptions,
    ) -> Result<JobHandle> {
        let kind = payload.kind();
        let max_attempts = options
            .max_attempts
            .unwrap_or(self.default_max_attempts)
            .max(1) as i32;

        let row = sqlx::query(
            r#"INSERT INTO queue_jobs (kind, payload, max_attempts, scheduled_at)
               VALUES ($1, $2, $3, COALESCE($4, NOW()))
               RETURNING id, scheduled_at"#,
        )
        .bind(kind.as_str())
        .bind(Json(&payload))
        .bind(max_attempts)
        .bind(options.scheduled_at)
        .fetch_one(executor)
        .await?;

        let handle = JobHandle {
            id: row.try_get("id")?,
            kind,
            scheduled_at: row.try_get("scheduled_at")?,
        };
        tracing::debug!(job_id = %handle.id, %kind, scheduled_at = %handle.scheduled_at, "Job enqueued");
        Ok(handle)
    }
}

fn job_from_row(row: &PgRow) -> Result<QueueJob> {
    let kind: String = row.try_get("kind")?;
    let state: String = row.try_get("state")?;
    let payload: Json<JobPayload> = row.try_get("payload")?;
    Ok(QueueJob {
        id: row.try_get("id")?,
        kind: kind.parse::<JobKind>().map_err(Error::Internal)?,
        payload: payload.0,
        state: state.parse::<JobState>().map_err(Error::Internal)?,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        scheduled_at: row.try_get("scheduled_at")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, payload: JobPayload, options: EnqueueOptions) -> Result<JobHandle> {
        self.insert_job(&self.pool, payload, options).await
    }

    async fn enqueue_batch(&self, jobs: Vec<(JobPayload, EnqueueOptions)>) -> Result<Vec<JobHandle>> {
        let mut tx = self.pool.begin().await?;
        let mut handles = Vec::with_capacity(jobs.len());
        for (payload, options) in jobs {
            handles.push(self.insert_job(&mut *tx, payload, options).await?);
        }
        tx.commit().await?;
        tracing::debug!(count = handles.len(), "Job batch enqueued");
        Ok(handles)
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Option<QueueJob>> {
        let sql = format!(
            r#"UPDATE queue_jobs
               SET state = 'ACTIVE', attempts = attempts + 1, started_at = NOW()
               WHERE id = (
                   SELECT id FROM queue_jobs
                   WHERE state = 'PENDING' AND scheduled_at <= $1
                   ORDER BY scheduled_at ASC, created_at ASC
                   FOR UPDATE SKIP LOCKED
                   LIMIT 1
               )
               RETURNING {}"#,
            JOB_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn complete(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE queue_jobs SET state = 'COMPLETED', finished_at = NOW(), last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query(
            r#"UPDATE queue_jobs
               SET last_error = $2,
                   state = CASE WHEN $3::timestamptz IS NULL THEN 'FAILED' ELSE 'PENDING' END,
                   scheduled_at = COALESCE($3, scheduled_at),
                   finished_at = CASE WHEN $3::timestamptz IS NULL THEN NOW() ELSE NULL END
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueJob>> {
        let sql = format!("SELECT {} FROM queue_jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn recover_stalled(&self, started_before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE queue_jobs SET state = 'PENDING', started_at = NULL \
             WHERE state = 'ACTIVE' AND started_at < $1",
        )
        .bind(started_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
