use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use uuid::Uuid;

use crate::{
    dto::upload_dto::UploadResumeResponse,
    error::{Error, Result},
    services::document_service::is_pdf,
    utils::text::clean_resume_text,
    AppState,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Reads the single `file` field, enforcing type and size.
async fn read_pdf_field(multipart: &mut Multipart, max_bytes: usize) -> Result<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if field.content_type() != Some(PDF_CONTENT_TYPE) {
            return Err(Error::BadRequest("Only PDF files are allowed".into()));
        }
        let data = field.bytes().await?;
        if data.len() > max_bytes {
            return Err(Error::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                max_bytes
            )));
        }
        if !is_pdf(&data) {
            return Err(Error::BadRequest("Invalid PDF file content".into()));
        }
        return Ok(data);
    }
    Err(Error::BadRequest("Multipart field 'file' is required".into()))
}

#[utoipa::path(
    post,
    path = "/jobs/upload/{id}",
    params(
        ("id" = Uuid, Path, description = "Job vacancy ID")
    ),
    responses(
        (status = 200, description = "Resume queued for extraction", body = UploadResumeResponse),
        (status = 400, description = "Missing or non-PDF file, or unknown vacancy"),
        (status = 413, description = "File too large")
    )
)]
#[axum::debug_handler]
pub async fn upload_resume(
    State(state): State<AppState>,
    vacancy_id: std::result::Result<Path<Uuid>, PathRejection>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let Path(vacancy_id) = vacancy_id?;
    let data = read_pdf_field(&mut multipart, state.upload_max_bytes).await?;
    tracing::info!(%vacancy_id, size = data.len(), "Resume upload received");

    let text = state.document_converter.to_text(&data).await?;
    let cleaned = clean_resume_text(&text);
    let handle = state.extraction_service.ingest(&cleaned, vacancy_id).await?;

    Ok(Json(UploadResumeResponse {
        data: cleaned,
        message: "Resume received; extraction queued".to_string(),
        job_id: handle.id,
    }))
}
