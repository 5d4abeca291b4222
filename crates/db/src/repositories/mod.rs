//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod alert_event_repo;
pub mod reading_repo;

pub use alert_event_repo::AlertEventRepo;
pub use reading_repo::ReadingRepo;
