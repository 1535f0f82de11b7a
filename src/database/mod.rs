pub mod application_store;
pub mod event_store;
pub mod job_queue;
pub mod pool;
pub mod user_directory;

pub use application_store::PgApplicationStore;
pub use event_store::PgEventStore;
pub use job_queue::PgJobQueue;
pub use pool::{create_pool, migrate};
pub use user_directory::PgUserDirectory;
