#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use hub_backend::error::{Error, Result};
use hub_backend::models::calendar_event::{
    CalendarEvent, CalendarEventChanges, CalendarEventDetails, EventStatus, NewCalendarEvent,
};
use hub_backend::models::email_template::EmailTemplate;
use hub_backend::models::job_application::{CandidateFields, JobApplication, MatchStats};
use hub_backend::models::job_vacancy::JobVacancy;
use hub_backend::models::queue_job::{JobKind, JobPayload, JobState, QueueJob};
use hub_backend::models::user::{CreatorSummary, User};
use hub_backend::services::ai_service::TextGenerator;
use hub_backend::services::calendar_event_service::EventStore;
use hub_backend::services::document_service::DocumentConverter;
use hub_backend::services::extraction_service::ApplicationStore;
use hub_backend::services::mail_service::{Mailer, OutgoingMail};
use hub_backend::services::queue_service::{EnqueueOptions, JobHandle, JobQueue};
use hub_backend::services::recipient_resolver::{UserDirectory, UserFilter};
use hub_backend::{AppState, Backends, StateOptions};

/// Users, templates, events, vacancies and applications in one place.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    templates: Mutex<HashMap<Uuid, EmailTemplate>>,
    events: Mutex<HashMap<Uuid, CalendarEvent>>,
    vacancies: Mutex<HashMap<Uuid, JobVacancy>>,
    applications: Mutex<Vec<JobApplication>>,
    pub find_users_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn add_user(&self, name: &str, email: &str, batch: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            batch: batch.map(str::to_string),
            section: None,
            course: None,
            tags: vec![],
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_template(&self, creator: &User) -> EmailTemplate {
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            subject: "Orientation".to_string(),
            body: "<p>See you in the main hall.</p>".to_string(),
            status: "ACTIVE".to_string(),
            created_by_id: creator.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.templates
            .lock()
            .unwrap()
            .insert(template.id, template.clone());
        template
    }

    pub fn add_vacancy(&self, body: &str) -> JobVacancy {
        let vacancy = JobVacancy {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            body: body.to_string(),
            status: "ACTIVE".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.vacancies
            .lock()
            .unwrap()
            .insert(vacancy.id, vacancy.clone());
        vacancy
    }

    pub fn event(&self, id: Uuid) -> Option<CalendarEvent> {
        self.events.lock().unwrap().get(&id).cloned()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn applications(&self) -> Vec<JobApplication> {
        self.applications.lock().unwrap().clone()
    }

    pub fn resolver_calls(&self) -> usize {
        self.find_users_calls.load(Ordering::SeqCst)
    }

    fn details(&self, event: CalendarEvent) -> Result<CalendarEventDetails> {
        let template = self
            .templates
            .lock()
            .unwrap()
            .get(&event.template_id)
            .cloned()
            .ok_or_else(|| Error::Internal("dangling template".into()))?;
        let creator = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == event.created_by_id)
            .map(CreatorSummary::from)
            .ok_or_else(|| Error::Internal("dangling creator".into()))?;
        Ok(CalendarEventDetails {
            event,
            email_template: template,
            created_by: creator,
        })
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_template(&self, id: Uuid) -> Result<Option<EmailTemplate>> {
        Ok(self.templates.lock().unwrap().get(&id).cloned())
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEvent> {
        let stored = CalendarEvent {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            color: event.color,
            event_date_time: event.event_date_time,
            status: EventStatus::Pending,
            to: event.to,
            condition: event.condition,
            template_id: event.template_id,
            created_by_id: event.created_by_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.events
            .lock()
            .unwrap()
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<CalendarEvent>> {
        Ok(self.event(id))
    }

    async fn find_event_details(&self, id: Uuid) -> Result<Option<CalendarEventDetails>> {
        self.event(id).map(|e| self.details(e)).transpose()
    }

    async fn list_events(&self) -> Result<Vec<CalendarEventDetails>> {
        let mut events: Vec<CalendarEvent> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| e.event_date_time);
        events.into_iter().map(|e| self.details(e)).collect()
    }

    async fn update_event(&self, id: Uuid, changes: CalendarEventChanges) -> Result<CalendarEvent> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&id).ok_or(Error::NotFound("event".into()))?;
        event.title = changes.title;
        event.description = changes.description;
        event.color = changes.color;
        event.event_date_time = changes.event_date_time;
        event.to = changes.to;
        event.condition = changes.condition;
        event.template_id = changes.template_id;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> Result<()> {
        self.events.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn set_event_status(&self, id: Uuid, status: EventStatus) -> Result<bool> {
        Ok(match self.events.lock().unwrap().get_mut(&id) {
            Some(event) => {
                event.status = status;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.find_users_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn find_vacancy(&self, id: Uuid) -> Result<Option<JobVacancy>> {
        Ok(self.vacancies.lock().unwrap().get(&id).cloned())
    }

    async fn find_application(&self, email: &str, vacancy_id: Uuid) -> Result<Option<JobApplication>> {
        Ok(self
            .applications
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email.as_deref() == Some(email) && a.job_vacancy_id == vacancy_id)
            .cloned())
    }

    async fn insert_application(&self, vacancy_id: Uuid, fields: &CandidateFields) -> Result<JobApplication> {
        let application = JobApplication {
            id: Uuid::new_v4(),
            name: fields.name.clone(),
            email: fields.email.clone(),
            phone: fields.phone_no.clone(),
            skills: fields.skills.clone(),
            profile: fields.profile.clone(),
            summary: fields.summary.clone(),
            years_of_experience: fields.years_of_experience.clone(),
            match_percentage: None,
            short_info: None,
            job_vacancy_id: vacancy_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.applications.lock().unwrap().push(application.clone());
        Ok(application)
    }

    async fn update_application_profile(&self, id: Uuid, fields: &CandidateFields) -> Result<JobApplication> {
        let mut applications = self.applications.lock().unwrap();
        let app = applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::NotFound("application".into()))?;
        app.name = fields.name.clone();
        app.email = fields.email.clone();
        app.phone = fields.phone_no.clone();
        app.skills = fields.skills.clone();
        app.profile = fields.profile.clone();
        app.summary = fields.summary.clone();
        app.years_of_experience = fields.years_of_experience.clone();
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn update_application_score(&self, id: Uuid, stats: &MatchStats) -> Result<JobApplication> {
        let mut applications = self.applications.lock().unwrap();
        let app = applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::NotFound("application".into()))?;
        app.match_percentage = stats.match_percentage;
        app.short_info = stats.candidate_info.clone();
        Ok(app.clone())
    }
}

/// Same claim and retry semantics as the Postgres queue, without SQL.
pub struct MemoryQueue {
    jobs: Mutex<Vec<QueueJob>>,
    default_max_attempts: u32,
    rejecting_batches: AtomicBool,
}

impl MemoryQueue {
    pub fn new(default_max_attempts: u32) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            default_max_attempts,
            rejecting_batches: AtomicBool::new(false),
        }
    }

    /// Makes `enqueue_batch` fail without storing anything.
    pub fn set_rejecting_batches(&self, rejecting: bool) {
        self.rejecting_batches.store(rejecting, Ordering::SeqCst);
    }

    fn new_job(&self, payload: JobPayload, options: EnqueueOptions) -> QueueJob {
        let now = Utc::now();
        QueueJob {
            id: Uuid::new_v4(),
            kind: payload.kind(),
            payload,
            state: JobState::Pending,
            attempts: 0,
            max_attempts: options.max_attempts.unwrap_or(self.default_max_attempts) as i32,
            scheduled_at: options.scheduled_at.unwrap_or(now),
            last_error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn jobs(&self) -> Vec<QueueJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn jobs_of(&self, kind: JobKind) -> Vec<QueueJob> {
        self.jobs().into_iter().filter(|j| j.kind == kind).collect()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, payload: JobPayload, options: EnqueueOptions) -> Result<JobHandle> {
        let job = self.new_job(payload, options);
        let handle = handle_of(&job);
        self.jobs.lock().unwrap().push(job);
        Ok(handle)
    }

    async fn enqueue_batch(&self, jobs: Vec<(JobPayload, EnqueueOptions)>) -> Result<Vec<JobHandle>> {
        if self.rejecting_batches.load(Ordering::SeqCst) {
            return Err(Error::Internal("batch insert aborted".into()));
        }
        let jobs: Vec<QueueJob> = jobs
            .into_iter()
            .map(|(payload, options)| self.new_job(payload, options))
            .collect();
        let handles = jobs.iter().map(handle_of).collect();
        self.jobs.lock().unwrap().extend(jobs);
        Ok(handles)
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Option<QueueJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        let next = jobs
            .iter_mut()
            .filter(|j| j.state == JobState::Pending && j.scheduled_at <= now)
            .min_by_key(|j| (j.scheduled_at, j.created_at));
        Ok(next.map(|job| {
            job.state = JobState::Active;
            job.attempts += 1;
            job.started_at = Some(now);
            job.clone()
        }))
    }

    async fn complete(&self, id: Uuid) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == id) {
            job.state = JobState::Completed;
            job.finished_at = Some(Utc::now());
            job.last_error = None;
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == id) {
            job.last_error = Some(error.to_string());
            match retry_at {
                Some(at) => {
                    job.state = JobState::Pending;
                    job.scheduled_at = at;
                }
                None => {
                    job.state = JobState::Failed;
                    job.finished_at = Some(Utc::now());
                }
            }
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueJob>> {
        Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
    }

    async fn recover_stalled(&self, started_before: DateTime<Utc>) -> Result<u64> {
        let mut recovered = 0;
        for job in self.jobs.lock().unwrap().iter_mut() {
            if job.state == JobState::Active && job.started_at.map_or(false, |s| s < started_before) {
                job.state = JobState::Pending;
                job.started_at = None;
                recovered += 1;
            }
        }
        Ok(recovered)
    }
}

fn handle_of(job: &QueueJob) -> JobHandle {
    JobHandle {
        id: job.id,
        kind: job.kind,
        scheduled_at: job.scheduled_at,
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Mail("relay unavailable".into()));
        }
        Ok(())
    }
}

/// Answers extraction and scoring prompts with canned replies.
pub struct ScriptedGenerator {
    extraction: Mutex<String>,
    scoring: Mutex<String>,
    failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(extraction: &str, scoring: &str) -> Self {
        Self {
            extraction: Mutex::new(extraction.to_string()),
            scoring: Mutex::new(scoring.to_string()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_extraction(&self, reply: &str) {
        *self.extraction.lock().unwrap() = reply.to_string();
    }

    pub fn set_scoring(&self, reply: &str) {
        *self.scoring.lock().unwrap() = reply.to_string();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::TextGeneration("service unavailable".into()));
        }
        let reply = if prompt.contains("Resume text:") {
            self.extraction.lock().unwrap().clone()
        } else {
            self.scoring.lock().unwrap().clone()
        };
        Ok(reply)
    }
}

pub struct FakeConverter {
    pub text: String,
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn to_text(&self, _document: &[u8]) -> Result<String> {
        Ok(self.text.clone())
    }
}

pub const EXTRACTION_REPLY: &str = "Name: Asha Rai\n\
Email: asha@example.com\n\
Phone Number: +977 9800000000\n\
Years of Experience: 4\n\
Skills Set: [Rust, PostgreSQL, Docker]\n\
Profile: Backend Engineer\n\
Summary: Builds async services.";

pub const SCORING_REPLY: &str = "[Response]\n## status\n$match: 82%\n<p>Strong backend fit.</p>";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const RESUME_TEXT: &str = "Asha Rai asha@example.com Backend Engineer Rust PostgreSQL";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
    pub mailer: Arc<RecordingMailer>,
    pub generator: Arc<ScriptedGenerator>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(StateOptions {
            operator_email: Some("ops@example.com".to_string()),
            ..StateOptions::default()
        })
    }

    pub fn with_options(options: StateOptions) -> Self {
        let store = Arc::new(MemoryStore::default());
        let queue = Arc::new(MemoryQueue::new(DEFAULT_MAX_ATTEMPTS));
        let mailer = Arc::new(RecordingMailer::default());
        let generator = Arc::new(ScriptedGenerator::new(EXTRACTION_REPLY, SCORING_REPLY));

        let state = AppState::from_backends(
            Backends {
                events: store.clone(),
                users: store.clone(),
                applications: store.clone(),
                queue: queue.clone(),
                generator: generator.clone(),
                mailer: mailer.clone(),
                document_converter: Arc::new(FakeConverter {
                    text: "Asha Rai\n\nasha@example.com\nRust, PostgreSQL".to_string(),
                }),
            },
            options,
        );

        Self {
            state,
            store,
            queue,
            mailer,
            generator,
        }
    }

    pub fn router(&self) -> axum::Router {
        hub_backend::router(self.state.clone())
    }

    /// Runs due jobs at `now` until the queue is idle.
    pub async fn drain_at(&self, now: DateTime<Utc>) -> usize {
        let worker = self.state.worker();
        let mut ran = 0;
        while worker.run_once_at(&self.state, now).await.expect("worker step") {
            ran += 1;
        }
        ran
    }
}
