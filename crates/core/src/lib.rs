//! Domain logic for the envmon telemetry service.
//!
//! Everything in this crate is pure or in-memory: credential checking,
//! payload validation, threshold evaluation and cooldown bookkeeping. The
//! `db`, `events` and `api` crates wire these pieces to PostgreSQL, the
//! notification channel and HTTP.

pub mod alert;
pub mod auth;
pub mod cooldown;
pub mod error;
pub mod ingest;
pub mod messages;
pub mod thresholds;
pub mod types;
