use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::calendar_event_dto::{CreateCalendarEventPayload, UpdateCalendarEventPayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/calendar-event",
    request_body = CreateCalendarEventPayload,
    responses(
        (status = 201, description = "Event created and delivery scheduled", body = CalendarEventDetails),
        (status = 400, description = "Malformed body, invalid payload, template or creator")
    )
)]
#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateCalendarEventPayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let event = state.calendar_event_service.create_event(payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/calendar-event",
    responses(
        (status = 200, description = "All events with template and creator", body = [CalendarEventDetails])
    )
)]
#[axum::debug_handler]
pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.calendar_event_service.list_events().await?;
    Ok(Json(events))
}

#[utoipa::path(
    patch,
    path = "/calendar-event/{id}",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body = UpdateCalendarEventPayload,
    responses(
        (status = 200, description = "Event updated; queued delivery is unchanged", body = CalendarEventDetails),
        (status = 400, description = "Unknown event or template")
    )
)]
#[axum::debug_handler]
pub async fn update_event(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<UpdateCalendarEventPayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let event = state.calendar_event_service.update_event(id, payload).await?;
    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/calendar-event/{id}",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Snapshot of the deleted event", body = CalendarEvent),
        (status = 400, description = "Unknown event")
    )
)]
#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;
    let event = state.calendar_event_service.delete_event(id).await?;
    Ok(Json(event))
}
