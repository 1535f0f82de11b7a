pub mod ai_service;
pub mod calendar_event_service;
pub mod document_service;
pub mod extraction_service;
pub mod mail_service;
pub mod queue_service;
pub mod recipient_resolver;
pub mod worker_service;
