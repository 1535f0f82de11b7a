use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::calendar_event::{
    CalendarEvent, CalendarEventChanges, CalendarEventDetails, EventStatus, NewCalendarEvent,
    TargetingCondition,
};
use crate::models::email_template::EmailTemplate;
use crate::models::user::CreatorSummary;
use crate::services::calendar_event_service::EventStore;

const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.color, e.event_date_time, e.status, \
     e.to_address, e.condition, e.template_id, e.created_by_id, e.created_at, e.updated_at";

const DETAIL_COLUMNS: &str = "t.id AS t_id, t.subject AS t_subject, t.body AS t_body, \
     t.status AS t_status, t.created_by_id AS t_created_by_id, t.created_at AS t_created_at, \
     t.updated_at AS t_updated_at, u.id AS u_id, u.name AS u_name, u.email AS u_email";

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn details_query(filter: &str) -> String {
        format!(
            "SELECT {}, {} FROM calendar_events e \
             JOIN email_templates t ON t.id = e.template_id \
             JOIN users u ON u.id = e.created_by_id {}",
            EVENT_COLUMNS, DETAIL_COLUMNS, filter
        )
    }
}

fn event_from_row(row: &PgRow) -> Result<CalendarEvent> {
    let status: String = row.try_get("status")?;
    let condition: Option<Json<TargetingCondition>> = row.try_get("condition")?;
    Ok(CalendarEvent {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        color: row.try_get("color")?,
        event_date_time: row.try_get("event_date_time")?,
        status: status.parse::<EventStatus>().map_err(Error::Internal)?,
        to: row.try_get("to_address")?,
        condition: condition.map(|c| c.0),
        template_id: row.try_get("template_id")?,
        created_by_id: row.try_get("created_by_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn details_from_row(row: &PgRow) -> Result<CalendarEventDetails> {
    Ok(CalendarEventDetails {
        event: event_from_row(row)?,
        email_template: EmailTemplate {
            id: row.try_get("t_id")?,
            subject: row.try_get("t_subject")?,
            body: row.try_get("t_body")?,
            status: row.try_get("t_status")?,
            created_by_id: row.try_get("t_created_by_id")?,
            created_at: row.try_get("t_created_at")?,
            updated_at: row.try_get("t_updated_at")?,
        },
        created_by: CreatorSummary {
            id: row.try_get("u_id")?,
            name: row.try_get("u_name")?,
            email: row.try_get("u_email")?,
        },
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn find_template(&self, id: Uuid) -> Result<Option<EmailTemplate>> {
        let template = sqlx::query_as::<_, EmailTemplate>(
            r#"SELECT id, subject, body, status, created_by_id, created_at, updated_at
               FROM email_templates WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<CalendarEvent> {
        let sql = format!(
            "INSERT INTO calendar_events AS e \
             (title, description, color, event_date_time, to_address, condition, template_id, created_by_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.color)
            .bind(event.event_date_time)
            .bind(&event.to)
            .bind(event.condition.map(Json))
            .bind(event.template_id)
            .bind(event.created_by_id)
            .fetch_one(&self.pool)
            .await?;
        event_from_row(&row)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<CalendarEvent>> {
        let sql = format!("SELECT {} FROM calendar_events e WHERE e.id = $1", EVENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(event_from_row).transpose()
    }

    async fn find_event_details(&self, id: Uuid) -> Result<Option<CalendarEventDetails>> {
        let row = sqlx::query(&Self::details_query("WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(details_from_row).transpose()
    }

    async fn list_events(&self) -> Result<Vec<CalendarEventDetails>> {
        let rows = sqlx::query(&Self::details_query("ORDER BY e.event_date_time ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(details_from_row).collect()
    }

    async fn update_event(&self, id: Uuid, changes: CalendarEventChanges) -> Result<CalendarEvent> {
        let sql = format!(
            "UPDATE calendar_events AS e SET title = $2, description = $3, color = $4, \
             event_date_time = $5, to_address = $6, condition = $7, template_id = $8, \
             updated_at = NOW() WHERE e.id = $1 RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.color)
            .bind(changes.event_date_time)
            .bind(&changes.to)
            .bind(changes.condition.map(Json))
            .bind(changes.template_id)
            .fetch_one(&self.pool)
            .await?;
        event_from_row(&row)
    }

    async fn delete_event(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM calendar_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_event_status(&self, id: Uuid, status: EventStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE calendar_events SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
