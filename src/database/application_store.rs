use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::job_application::{CandidateFields, JobApplication, MatchStats};
use crate::models::job_vacancy::JobVacancy;
use crate::services::extraction_service::ApplicationStore;

const APPLICATION_COLUMNS: &str = "id, name, email, phone, skills, profile, summary, \
     years_of_experience, match_percentage, short_info, job_vacancy_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn find_vacancy(&self, id: Uuid) -> Result<Option<JobVacancy>> {
        let vacancy = sqlx::query_as::<_, JobVacancy>(
            "SELECT id, title, body, status, created_at, updated_at FROM job_vacancies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vacancy)
    }

    async fn find_application(&self, email: &str, vacancy_id: Uuid) -> Result<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {} FROM job_applications WHERE email = $1 AND job_vacancy_id = $2",
            APPLICATION_COLUMNS
        ))
        .bind(email)
        .bind(vacancy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn insert_application(&self, vacancy_id: Uuid, fields: &CandidateFields) -> Result<JobApplication> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "INSERT INTO job_applications \
             (name, email, phone, skills, profile, summary, years_of_experience, job_vacancy_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone_no)
        .bind(&fields.skills)
        .bind(&fields.profile)
        .bind(&fields.summary)
        .bind(&fields.years_of_experience)
        .bind(vacancy_id)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(application_id = %application.id, "Created job application");
        Ok(application)
    }

    async fn update_application_profile(&self, id: Uuid, fields: &CandidateFields) -> Result<JobApplication> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "UPDATE job_applications SET name = $2, email = $3, phone = $4, skills = $5, \
             profile = $6, summary = $7, years_of_experience = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone_no)
        .bind(&fields.skills)
        .bind(&fields.profile)
        .bind(&fields.summary)
        .bind(&fields.years_of_experience)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }

    async fn update_application_score(&self, id: Uuid, stats: &MatchStats) -> Result<JobApplication> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "UPDATE job_applications SET match_percentage = $2, short_info = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(stats.match_percentage)
        .bind(&stats.candidate_info)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }
}
