use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned once a resume is queued for extraction. Scoring happens later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeResponse {
    pub data: String,
    pub message: String,
    pub job_id: Uuid,
}
