//! Work-session ledger with progress statistics and a rolling project deadline.
//!
//! - [`ledger`]: newest-first store of [`models::LogEntry`] with JSON/CSV export.
//! - [`stats`]: pure aggregation over a ledger snapshot.
//! - [`lifecycle`]: up to three active projects, each with 7 days to show
//!   progress before it dies; plus an idea bank feeding the active set.
//! - [`tracker`]: ties the above together and recomputes on every change.
//!
//! All state lives behind the [`db::KeyValueStore`] port.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod settings;
pub mod stats;
pub mod tracker;
