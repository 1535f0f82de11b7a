pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::database::{PgApplicationStore, PgEventStore, PgJobQueue, PgUserDirectory};
use crate::error::Result;
use crate::services::{
    ai_service::{OpenAiTextGenerator, TextGenerator},
    calendar_event_service::{CalendarEventService, EventStore},
    document_service::{DocumentConverter, PdfToTextConverter},
    extraction_service::{ApplicationStore, ExtractionService},
    mail_service::{HttpMailer, MailService, Mailer},
    queue_service::{JobQueue, RetryPolicy},
    recipient_resolver::UserDirectory,
    worker_service::QueueWorker,
};

/// Collaborators behind every service. Postgres and HTTP in production,
/// in-memory fakes in tests.
pub struct Backends {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserDirectory>,
    pub applications: Arc<dyn ApplicationStore>,
    pub queue: Arc<dyn JobQueue>,
    pub generator: Arc<dyn TextGenerator>,
    pub mailer: Arc<dyn Mailer>,
    pub document_converter: Arc<dyn DocumentConverter>,
}

#[derive(Debug, Clone)]
pub struct StateOptions {
    pub client_url: String,
    pub operator_email: Option<String>,
    pub retry_policy: RetryPolicy,
    pub upload_max_bytes: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            client_url: "http://localhost:3000".to_string(),
            operator_email: None,
            retry_policy: RetryPolicy::default(),
            upload_max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn JobQueue>,
    pub mail_service: MailService,
    pub calendar_event_service: CalendarEventService,
    pub extraction_service: ExtractionService,
    pub document_converter: Arc<dyn DocumentConverter>,
    pub retry_policy: RetryPolicy,
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        let backends = Backends {
            events: Arc::new(PgEventStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            applications: Arc::new(PgApplicationStore::new(pool.clone())),
            queue: Arc::new(PgJobQueue::new(pool, config.queue_max_attempts)),
            generator: Arc::new(OpenAiTextGenerator::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                http_client.clone(),
            )),
            mailer: Arc::new(HttpMailer::new(
                http_client,
                config.mail_api_url.clone(),
                config.mail_api_key.clone(),
                config.mail_from.clone(),
            )),
            document_converter: Arc::new(PdfToTextConverter::default()),
        };

        Ok(Self::from_backends(
            backends,
            StateOptions {
                client_url: config.client_url.clone(),
                operator_email: config.operator_email.clone(),
                retry_policy: RetryPolicy::default(),
                upload_max_bytes: config.upload_max_bytes,
            },
        ))
    }

    pub fn from_backends(backends: Backends, options: StateOptions) -> Self {
        let mail_service = MailService::new(
            backends.queue.clone(),
            backends.mailer,
            options.client_url,
            options.operator_email,
        );
        let calendar_event_service = CalendarEventService::new(
            backends.events,
            backends.users,
            mail_service.clone(),
            backends.queue.clone(),
        );
        let extraction_service = ExtractionService::new(
            backends.applications,
            backends.generator,
            backends.queue.clone(),
        );

        Self {
            queue: backends.queue,
            mail_service,
            calendar_event_service,
            extraction_service,
            document_converter: backends.document_converter,
            retry_policy: options.retry_policy,
            upload_max_bytes: options.upload_max_bytes,
        }
    }

    pub fn worker(&self) -> QueueWorker {
        QueueWorker::new(self.queue.clone(), self.retry_policy)
    }
}

pub fn router(state: AppState) -> Router {
    // Multipart framing needs headroom above the file limit.
    let upload_limit = state.upload_max_bytes + 64 * 1024;

    let upload_routes = Router::new()
        .route("/jobs/upload/:id", post(routes::jobs::upload_resume))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/calendar-event",
            get(routes::calendar_event::list_events).post(routes::calendar_event::create_event),
        )
        .route(
            "/calendar-event/:id",
            patch(routes::calendar_event::update_event)
                .delete(routes::calendar_event::delete_event),
        )
        .route("/queue/jobs/:id", get(routes::queue::get_job))
        .merge(upload_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
