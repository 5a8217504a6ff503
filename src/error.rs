use thiserror::Error;

use crate::models::{FieldErrors, MAX_ACTIVE_PROJECTS};

/// Failure of the persistence medium.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid entry: {}", describe(.0))]
    Validation(FieldErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("at most {MAX_ACTIVE_PROJECTS} active projects; remove one first")]
    CapacityExceeded,
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn describe(errors: &FieldErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join(", ")
}
