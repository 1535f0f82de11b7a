use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::calendar_event::{CalendarEvent, CalendarEventChanges, TargetingCondition};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCalendarEventPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time: DateTime<Utc>,
    pub template_id: Uuid,
    pub created_by: Uuid,
    #[validate(length(min = 1, max = 32))]
    pub color: String,
    #[validate(email)]
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
}

/// A create request that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedEvent {
    pub title: String,
    pub description: String,
    pub color: String,
    pub time: DateTime<Utc>,
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
    pub template_id: Uuid,
    pub created_by: Uuid,
}

impl CreateCalendarEventPayload {
    /// Blank `to` counts as absent. One of `to` or `condition` must remain.
    pub fn into_validated(mut self) -> Result<ValidatedEvent> {
        self.to = normalize_address(self.to.take());
        self.validate()?;
        if self.to.is_none() && self.condition.is_none() {
            return Err(Error::BadRequest(
                "Either a recipient (to) or a targeting condition is required".to_string(),
            ));
        }

        Ok(ValidatedEvent {
            title: self.title.trim().to_string(),
            description: self.description,
            color: self.color,
            time: self.time,
            to: self.to,
            condition: self.condition,
            template_id: self.template_id,
            created_by: self.created_by,
        })
    }
}

/// Partial update. Omitted fields keep their stored values; `createdBy` is
/// accepted on the wire and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCalendarEventPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub template_id: Option<Uuid>,
    #[validate(length(min = 1, max = 32))]
    pub color: Option<String>,
    #[validate(email)]
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
}

impl UpdateCalendarEventPayload {
    pub fn validate_patch(&self) -> Result<()> {
        let mut normalized = self.clone();
        normalized.to = normalize_address(normalized.to);
        normalized.validate()?;
        Ok(())
    }

    pub fn apply_to(self, existing: &CalendarEvent) -> CalendarEventChanges {
        CalendarEventChanges {
            title: self.title.unwrap_or_else(|| existing.title.clone()),
            description: self
                .description
                .unwrap_or_else(|| existing.description.clone()),
            color: self.color.unwrap_or_else(|| existing.color.clone()),
            event_date_time: self.time.unwrap_or(existing.event_date_time),
            to: match self.to {
                Some(to) => normalize_address(Some(to)),
                None => existing.to.clone(),
            },
            condition: self.condition.or_else(|| existing.condition.clone()),
            template_id: self.template_id.unwrap_or(existing.template_id),
        }
    }
}

fn normalize_address(to: Option<String>) -> Option<String> {
    to.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
