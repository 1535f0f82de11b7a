pub mod calendar_event_dto;
pub mod upload_dto;
