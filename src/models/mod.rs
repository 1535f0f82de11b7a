pub mod calendar_event;
pub mod email_template;
pub mod job_application;
pub mod job_vacancy;
pub mod queue_job;
pub mod user;
