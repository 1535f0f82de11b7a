use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job_application::{CandidateFields, JobApplication, MatchStats};
use crate::models::job_vacancy::JobVacancy;
use crate::models::queue_job::{ExtractionRequest, JobPayload};
use crate::services::ai_service::TextGenerator;
use crate::services::queue_service::{EnqueueOptions, JobHandle, JobQueue};

const RECRUITER_SYSTEM_PROMPT: &str = "You are a helpful HR recruiter.";

const EXTRACTION_QUESTION: &str = r#"From above candidate's resume text, extract the only following details:
Name: (Find the candidate's full name. If not available, specify "not available.")
Email: (Locate the candidate's email address. If not available, specify "not available.")
Phone Number: (Identify the candidate's phone number. If not found, specify "not available.")
Years of Experience: (If not explicitly mentioned, calculate the years of experience by analyzing the time durations at each company or position listed. Sum up the total durations to estimate the years of experience. If not determinable, write "not available.")
Skills Set: Extract the skills which are purely technical and represent them as: [skill1, skill2,... <other skills from resume>]. If no skills are provided, state "not available."
Profile: (Identify the candidate's job profile or designation. If not mentioned, specify "not available.")
Summary: provide a brief summary of the candidate's profile without using more than one newline to segregate sections."#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn find_vacancy(&self, id: Uuid) -> Result<Option<JobVacancy>>;

    async fn find_application(&self, email: &str, vacancy_id: Uuid) -> Result<Option<JobApplication>>;

    async fn insert_application(&self, vacancy_id: Uuid, fields: &CandidateFields) -> Result<JobApplication>;

    async fn update_application_profile(&self, id: Uuid, fields: &CandidateFields) -> Result<JobApplication>;

    async fn update_application_score(&self, id: Uuid, stats: &MatchStats) -> Result<JobApplication>;
}

#[derive(Clone)]
pub struct ExtractionService {
    applications: Arc<dyn ApplicationStore>,
    generator: Arc<dyn TextGenerator>,
    queue: Arc<dyn JobQueue>,
}

impl ExtractionService {
    pub fn new(
        applications: Arc<dyn ApplicationStore>,
        generator: Arc<dyn TextGenerator>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            applications,
            generator,
            queue,
        }
    }

    /// Validates the submission and queues it for extraction.
    pub async fn ingest(&self, resume_text: &str, vacancy_id: Uuid) -> Result<JobHandle> {
        let text = validate_resume_text(resume_text)?;
        if self.applications.find_vacancy(vacancy_id).await?.is_none() {
            return Err(Error::BadRequest(format!(
                "Job vacancy with id {} does not exist",
                vacancy_id
            )));
        }

        tracing::info!(%vacancy_id, "Queueing info extraction for job vacancy");
        self.queue
            .enqueue(
                JobPayload::ExtractInfo(ExtractionRequest {
                    text: text.to_string(),
                    vacancy_id,
                }),
                EnqueueOptions::default(),
            )
            .await
    }

    /// Worker side: extract, upsert, score.
    pub async fn process(&self, request: &ExtractionRequest) -> Result<JobApplication> {
        tracing::info!(vacancy_id = %request.vacancy_id, "Processing candidate info");

        let vacancy = self
            .applications
            .find_vacancy(request.vacancy_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Job vacancy {} no longer exists", request.vacancy_id))
            })?;

        let reply = self
            .generator
            .complete(RECRUITER_SYSTEM_PROMPT, &extraction_prompt(&request.text))
            .await?;
        let fields = parse_candidate_fields(&reply);
        tracing::debug!(?fields, "Extracted candidate fields");

        let application = self.upsert(request.vacancy_id, &fields).await?;

        let reply = self
            .generator
            .complete(
                RECRUITER_SYSTEM_PROMPT,
                &scoring_prompt(&fields, &vacancy.body)?,
            )
            .await?;
        let stats = parse_match_stats(&reply);
        tracing::info!(
            application_id = %application.id,
            match_percentage = ?stats.match_percentage,
            "Scored candidate"
        );

        self.applications
            .update_application_score(application.id, &stats)
            .await
    }

    async fn upsert(&self, vacancy_id: Uuid, fields: &CandidateFields) -> Result<JobApplication> {
        let existing = match fields.email.as_deref() {
            Some(email) => self.applications.find_application(email, vacancy_id).await?,
            None => None,
        };
        match existing {
            Some(existing) => {
                tracing::info!(application_id = %existing.id, "Updating existing application");
                self.applications
                    .update_application_profile(existing.id, fields)
                    .await
            }
            None => self.applications.insert_application(vacancy_id, fields).await,
        }
    }
}

pub fn validate_resume_text(resume_text: &str) -> Result<&str> {
    let text = resume_text.trim();
    if text.is_empty() {
        return Err(Error::BadRequest(
            "No readable text found in the uploaded resume".to_string(),
        ));
    }
    Ok(text)
}

pub fn extraction_prompt(resume_text: &str) -> String {
    format!(
        "Based on the below given candidate information, only answer asked question:\nResume text: {}\nQuestion: {}",
        resume_text, EXTRACTION_QUESTION
    )
}

pub fn scoring_prompt(fields: &CandidateFields, job_description: &str) -> Result<String> {
    let candidate = serde_json::to_string(fields)?;
    Ok(format!(
        "Read below candidate information about the candidate:\n{}\nQuestion: What percentage of the job requirements does the candidate meet for the following job description?\n\
         Answer in 3 lines only and be efficient while answering.\n\
         Provide the answer in the following format:\n\n[Response]\n## status\n$match: [percentage]%\n<p>[short evaluation of the candidate]</p>\n\n{}",
        candidate, job_description
    ))
}

fn field_value(reply: &str, prefix: &str) -> Option<String> {
    reply
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix(prefix))
        .map(str::trim)
        .filter(|v| is_available(v))
        .map(str::to_string)
}

fn is_available(value: &str) -> bool {
    let normalized = value.trim_end_matches('.').trim().to_ascii_lowercase();
    !normalized.is_empty() && normalized != "not available"
}

fn skills_value(reply: &str) -> Option<Vec<String>> {
    static SKILLS: OnceLock<Regex> = OnceLock::new();
    let re = SKILLS.get_or_init(|| Regex::new(r"Skills Set:\s*\[(.*)\]").expect("valid skills pattern"));
    let raw = re.captures(reply)?.get(1)?.as_str();
    let skills: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if skills.is_empty() {
        None
    } else {
        Some(skills)
    }
}

/// Parses the line-prefixed extraction reply. Missing lines become `None`.
pub fn parse_candidate_fields(reply: &str) -> CandidateFields {
    CandidateFields {
        name: field_value(reply, "Name:"),
        email: field_value(reply, "Email:"),
        phone_no: field_value(reply, "Phone Number:"),
        years_of_experience: field_value(reply, "Years of Experience:"),
        skills: skills_value(reply),
        profile: field_value(reply, "Profile:"),
        summary: field_value(reply, "Summary:"),
    }
}

/// Pulls `$match: NN%` and a short evaluation out of the scoring reply.
pub fn parse_match_stats(reply: &str) -> MatchStats {
    static MATCH: OnceLock<Regex> = OnceLock::new();
    static PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    let match_re = MATCH.get_or_init(|| Regex::new(r"\$match:\s*(\d+)%").expect("valid match pattern"));
    let paragraph_re =
        PARAGRAPH.get_or_init(|| Regex::new(r"(?s)<p>(.*?)</p>").expect("valid paragraph pattern"));

    let found = match_re.captures(reply);
    let match_percentage = found
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok());

    let candidate_info = paragraph_re
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            let tail = &reply[found.as_ref()?.get(0)?.end()..];
            let tail = tail.trim();
            (!tail.is_empty()).then(|| tail.to_string())
        });

    MatchStats {
        match_percentage,
        candidate_info,
    }
}
