use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Candidate profile extracted from an uploaded resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub profile: Option<String>,
    pub summary: Option<String>,
    pub years_of_experience: Option<String>,
    pub match_percentage: Option<i32>,
    pub short_info: Option<String>,
    pub job_vacancy_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured fields the text service pulls out of a resume. Every field is
/// optional; a missing line never fails the extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_no: Option<String>,
    pub years_of_experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub profile: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub match_percentage: Option<i32>,
    pub candidate_info: Option<String>,
}
