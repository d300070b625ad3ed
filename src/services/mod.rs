pub mod clock;
pub mod ingestion_service;
pub mod scheduler;
pub mod shutdown;
pub mod universe_service;
