use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    AppState,
};

#[utoipa::path(
    get,
    path = "/queue/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Queue job ID")
    ),
    responses(
        (status = 200, description = "Job record", body = QueueJob),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;
    let job = state
        .queue
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
    Ok(Json(job))
}
