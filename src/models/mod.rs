//! Domain models for the progress ledger.
//!
//! # Core Concepts
//!
//! ## Ledger
//!
//! - [`LogEntry`]: One documented work session. The ledger is the single source of
//!   truth for "has progress occurred".
//!
//! ## Lifecycle
//!
//! - [`ActiveProject`]: A project under the rolling 7-day deadline. At most
//!   [`MAX_ACTIVE_PROJECTS`] exist at once.
//! - [`DeadProject`]: Append-only record of a project that expired or was dropped.
//! - [`Idea`]: A project candidate waiting in the idea bank for a free slot.
//!
//! ## Derived
//!
//! - [`Stats`]: Aggregate counters computed from a ledger snapshot.

mod entry;
mod project;
mod settings;
mod stats;

pub use entry::*;
pub use project::*;
pub use settings::*;
pub use stats::*;
