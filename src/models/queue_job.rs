use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::calendar_event::TargetingCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    SendOtp,
    SendNow,
    SendQueued,
    Welcome,
    ExtractInfo,
    EventFanOut,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SendOtp => "SEND_OTP",
            JobKind::SendNow => "SEND_NOW",
            JobKind::SendQueued => "SEND_QUEUED",
            JobKind::Welcome => "WELCOME",
            JobKind::ExtractInfo => "EXTRACT_INFO",
            JobKind::EventFanOut => "EVENT_FAN_OUT",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND_OTP" => Ok(JobKind::SendOtp),
            "SEND_NOW" => Ok(JobKind::SendNow),
            "SEND_QUEUED" => Ok(JobKind::SendQueued),
            "WELCOME" => Ok(JobKind::Welcome),
            "EXTRACT_INFO" => Ok(JobKind::ExtractInfo),
            "EVENT_FAN_OUT" => Ok(JobKind::EventFanOut),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Active => "ACTIVE",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        }
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobState::Pending),
            "ACTIVE" => Ok(JobState::Active),
            "COMPLETED" => Ok(JobState::Completed),
            "FAILED" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpMail {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMail {
    pub name: String,
    pub email: String,
    pub password: String,
    pub app_url: String,
}

/// A templated mail addressed to one recipient on behalf of an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMail {
    pub email: String,
    pub subject: String,
    pub body: String,
    pub author: String,
    /// Calendar event to mark completed once the mail is out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub text: String,
    pub vacancy_id: Uuid,
}

/// Snapshot of an audience-mode event taken when its delivery was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutRequest {
    pub event_id: Uuid,
    pub condition: TargetingCondition,
    pub subject: String,
    pub body: String,
    pub author: String,
}

/// Everything a worker needs to run a job. Only plain data goes in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPayload {
    SendOtp(OtpMail),
    SendNow(DirectMail),
    SendQueued(DirectMail),
    Welcome(WelcomeMail),
    ExtractInfo(ExtractionRequest),
    EventFanOut(FanOutRequest),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::SendOtp(_) => JobKind::SendOtp,
            JobPayload::SendNow(_) => JobKind::SendNow,
            JobPayload::SendQueued(_) => JobKind::SendQueued,
            JobPayload::Welcome(_) => JobKind::Welcome,
            JobPayload::ExtractInfo(_) => JobKind::ExtractInfo,
            JobPayload::EventFanOut(_) => JobKind::EventFanOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub state: JobState,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
