//! Row models and insert DTOs.

pub mod alert_event;
pub mod reading;
