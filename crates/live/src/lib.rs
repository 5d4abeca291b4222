//! Live view of one device's readings.
//!
//! A [`Reconciler`](reconciler::Reconciler) merges a one-time history fetch
//! with the server's live feed into a bounded, chronologically ordered list.
//! [`LiveView`](session::LiveView) drives it: subscribe first, fetch the
//! baseline, then fold feed events, publishing snapshots through a
//! `tokio::sync::watch` channel.

pub mod config;
pub mod reconciler;
pub mod row;
pub mod session;
pub mod source;
pub mod status;
