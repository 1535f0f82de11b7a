pub mod calendar_event;
pub mod health;
pub mod jobs;
pub mod queue;
