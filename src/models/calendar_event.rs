use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::email_template::EmailTemplate;
use crate::models::user::CreatorSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Pending,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EventStatus::Pending),
            "COMPLETED" => Ok(EventStatus::Completed),
            other => Err(format!("unknown event status: {}", other)),
        }
    }
}

/// Audience filter embedded in a calendar event. Absent or empty lists put no
/// constraint on their dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingCondition {
    pub batches: Vec<String>,
    pub course: Option<String>,
    pub sections: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub color: String,
    pub event_date_time: DateTime<Utc>,
    pub status: EventStatus,
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
    pub template_id: Uuid,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Single-recipient address, if one governs delivery. Blank addresses
    /// do not count.
    pub fn recipient(&self) -> Option<&str> {
        self.to
            .as_deref()
            .map(str::trim)
            .filter(|to| !to.is_empty())
    }
}

/// An event joined with its template and creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventDetails {
    #[serde(flatten)]
    pub event: CalendarEvent,
    pub email_template: EmailTemplate,
    pub created_by: CreatorSummary,
}

/// Fields of an event about to be inserted.
#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: String,
    pub color: String,
    pub event_date_time: DateTime<Utc>,
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
    pub template_id: Uuid,
    pub created_by_id: Uuid,
}

/// Resolved partial update. Every field is the value to write.
#[derive(Debug, Clone)]
pub struct CalendarEventChanges {
    pub title: String,
    pub description: String,
    pub color: String,
    pub event_date_time: DateTime<Utc>,
    pub to: Option<String>,
    pub condition: Option<TargetingCondition>,
    pub template_id: Uuid,
}
