use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::calendar_event_dto::{
    CreateCalendarEventPayload, UpdateCalendarEventPayload, ValidatedEvent,
};
use crate::error::{Error, Result};
use crate::models::calendar_event::{
    CalendarEvent, CalendarEventChanges, CalendarEventDetails, EventStatus, NewCalendarEvent,
};
use crate::models::email_template::EmailTemplate;
use crate::models::queue_job::{DirectMail, FanOutRequest, JobPayload};
use crate::models::user::CreatorSummary;
use crate::services::mail_service::MailService;
use crate::services::queue_service::{EnqueueOptions, JobHandle, JobQueue};
use crate::services::recipient_resolver::{RecipientResolver, UserDirectory};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_template(&self, id: Uuid) -> Result<Option<EmailTemplate>>;

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEvent>;

    async fn find_event(&self, id: Uuid) -> Result<Option<CalendarEvent>>;

    async fn find_event_details(&self, id: Uuid) -> Result<Option<CalendarEventDetails>>;

    async fn list_events(&self) -> Result<Vec<CalendarEventDetails>>;

    async fn update_event(&self, id: Uuid, changes: CalendarEventChanges) -> Result<CalendarEvent>;

    async fn delete_event(&self, id: Uuid) -> Result<()>;

    /// Returns whether a row was touched.
    async fn set_event_status(&self, id: Uuid, status: EventStatus) -> Result<bool>;
}

#[derive(Clone)]
pub struct CalendarEventService {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserDirectory>,
    resolver: RecipientResolver,
    mail: MailService,
    queue: Arc<dyn JobQueue>,
}

impl CalendarEventService {
    pub fn new(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserDirectory>,
        mail: MailService,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let resolver = RecipientResolver::new(users.clone());
        Self {
            events,
            users,
            resolver,
            mail,
            queue,
        }
    }

    pub async fn create_event(
        &self,
        payload: CreateCalendarEventPayload,
    ) -> Result<CalendarEventDetails> {
        let event = payload.into_validated()?;

        let template = self
            .events
            .find_template(event.template_id)
            .await?
            .ok_or_else(|| {
                Error::BadRequest(format!("Invalid template id provided {}", event.template_id))
            })?;
        let creator = self
            .users
            .find_user(event.created_by)
            .await?
            .ok_or_else(|| {
                Error::BadRequest(format!("Invalid user id provided {}", event.created_by))
            })?;

        let ValidatedEvent {
            title,
            description,
            color,
            time,
            to,
            condition,
            template_id,
            created_by,
        } = event;
        let stored = self
            .events
            .insert_event(NewCalendarEvent {
                title,
                description,
                color,
                event_date_time: time,
                to,
                condition,
                template_id,
                created_by_id: created_by,
            })
            .await?;
        tracing::info!(event_id = %stored.id, fire_at = %stored.event_date_time, "Calendar event created");

        let details = CalendarEventDetails {
            event: stored,
            email_template: template,
            created_by: CreatorSummary::from(&creator),
        };
        self.schedule_delivery(&details).await?;
        Ok(details)
    }

    /// Registers the deferred job that delivers this event at its fire time.
    /// `to` wins over `condition`; the resolver only runs when the fan-out fires.
    pub async fn schedule_delivery(&self, details: &CalendarEventDetails) -> Result<JobHandle> {
        let event = &details.event;
        let fire_at = event.event_date_time;

        if let Some(to) = event.recipient() {
            tracing::info!(event_id = %event.id, %fire_at, "Email will be sent to 1 user");
            return self
                .mail
                .send_now(
                    DirectMail {
                        email: to.to_string(),
                        subject: details.email_template.subject.clone(),
                        body: details.email_template.body.clone(),
                        author: details.created_by.name.clone(),
                        event_id: Some(event.id),
                    },
                    Some(fire_at),
                )
                .await;
        }

        let handle = self
            .queue
            .enqueue(
                JobPayload::EventFanOut(FanOutRequest {
                    event_id: event.id,
                    condition: event.condition.clone().unwrap_or_default(),
                    subject: details.email_template.subject.clone(),
                    body: details.email_template.body.clone(),
                    author: details.created_by.name.clone(),
                }),
                EnqueueOptions::at(fire_at),
            )
            .await?;
        tracing::info!(event_id = %event.id, job_id = %handle.id, %fire_at, "Audience email scheduled");
        Ok(handle)
    }

    /// Runs when a fan-out job fires. The audience is resolved now, not at creation.
    pub async fn fan_out(&self, request: &FanOutRequest) -> Result<usize> {
        let users = self.resolver.resolve(&request.condition).await?;
        tracing::info!(event_id = %request.event_id, recipients = users.len(), "Email will be sent to resolved audience");

        // One batch, so a retried fan-out never re-sends to part of the audience.
        let mails = users
            .iter()
            .map(|user| DirectMail {
                email: user.email.clone(),
                subject: request.subject.clone(),
                body: request.body.clone(),
                author: request.author.clone(),
                event_id: None,
            })
            .collect();
        self.mail.send_queued_batch(mails).await?;

        self.mark_completed(request.event_id).await;
        Ok(users.len())
    }

    /// Idempotent. Errors are logged because no caller is waiting.
    pub async fn mark_completed(&self, id: Uuid) {
        match self.events.set_event_status(id, EventStatus::Completed).await {
            Ok(true) => tracing::info!(event_id = %id, "Calendar event completed"),
            Ok(false) => tracing::warn!(event_id = %id, "Calendar event vanished before completion"),
            Err(e) => tracing::error!(event_id = %id, error = %e, "Failed to mark calendar event completed"),
        }
    }

    /// Does not touch delivery jobs that are already queued.
    pub async fn update_event(
        &self,
        id: Uuid,
        payload: UpdateCalendarEventPayload,
    ) -> Result<CalendarEventDetails> {
        payload.validate_patch()?;
        let existing = self
            .events
            .find_event(id)
            .await?
            .ok_or_else(|| Error::BadRequest(format!("Event with id {} does not exist", id)))?;

        if let Some(template_id) = payload.template_id {
            if self.events.find_template(template_id).await?.is_none() {
                return Err(Error::BadRequest(format!(
                    "Invalid template id provided {}",
                    template_id
                )));
            }
        }

        let changes = payload.apply_to(&existing);
        self.events.update_event(id, changes).await?;
        tracing::info!(event_id = %id, "Calendar event updated; queued delivery left untouched");

        self.events
            .find_event_details(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Event with id {} does not exist", id)))
    }

    /// Returns the snapshot taken before deletion. Queued delivery stays queued.
    pub async fn delete_event(&self, id: Uuid) -> Result<CalendarEvent> {
        let existing = self
            .events
            .find_event(id)
            .await?
            .ok_or_else(|| Error::BadRequest(format!("Event with id {} does not exist", id)))?;
        self.events.delete_event(id).await?;
        tracing::info!(event_id = %id, "Calendar event deleted");
        Ok(existing)
    }

    pub async fn list_events(&self) -> Result<Vec<CalendarEventDetails>> {
        tracing::info!("Fetching all events");
        self.events.list_events().await
    }
}
