use std::sync::MutexGuard;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::SharedTracker;
use crate::db::SqliteStore;
use crate::error::{LedgerError, LifecycleError, SettingsError, StoreError};
use crate::models::*;
use crate::tracker::Tracker;

// ============================================================
// Error Handling
// ============================================================

/// Error response with a JSON body of the form `{ "error": ..., "fields"?: ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message.into() }),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Log a storage failure and return a sanitized response. The medium being
/// unavailable is reported as 503 so clients know to retry with the same input.
fn store_error(e: StoreError) -> ApiError {
    tracing::error!("Storage error: {}", e);
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
}

fn ledger_error(e: LedgerError) -> ApiError {
    match e {
        LedgerError::Validation(fields) => {
            tracing::warn!("Validation error: {:?}", fields);
            ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: serde_json::json!({ "error": "Validation failed", "fields": fields }),
            }
        }
        LedgerError::Store(e) => store_error(e),
    }
}

fn lifecycle_error(e: LifecycleError) -> ApiError {
    match e {
        LifecycleError::CapacityExceeded => ApiError::new(StatusCode::CONFLICT, e.to_string()),
        LifecycleError::Empty(_) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        LifecycleError::Store(e) => store_error(e),
    }
}

fn settings_error(e: SettingsError) -> ApiError {
    match e {
        SettingsError::InvalidTime(_) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        SettingsError::Store(e) => store_error(e),
    }
}

fn lock(state: &SharedTracker) -> Result<MutexGuard<'_, Tracker<SqliteStore>>, ApiError> {
    state.lock().map_err(|_| {
        tracing::error!("Tracker lock poisoned");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Ledger
// ============================================================

/// Query parameters for browsing entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    pub search: Option<String>,
    pub project: Option<String>,
    pub sort: Option<String>,
}

pub async fn list_entries(
    State(state): State<SharedTracker>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let sort = match query.sort.as_deref() {
        None => SortBy::default(),
        Some(s) => SortBy::from_str(s).ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Unknown sort '{}', expected date, project or time", s),
            )
        })?,
    };
    let tracker = lock(&state)?;
    Ok(Json(tracker.ledger().query(&EntryQuery {
        search: query.search,
        project: query.project,
        sort,
    })))
}

pub async fn get_entry(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
) -> Result<Json<LogEntry>, ApiError> {
    lock(&state)?
        .ledger()
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Entry"))
}

pub async fn create_entry(
    State(state): State<SharedTracker>,
    Json(input): Json<CreateEntryInput>,
) -> Result<(StatusCode, Json<LogEntry>), ApiError> {
    lock(&state)?
        .log(input)
        .map(|e| (StatusCode::CREATED, Json(e)))
        .map_err(ledger_error)
}

pub async fn update_entry(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateEntryInput>,
) -> Result<Json<LogEntry>, ApiError> {
    lock(&state)?
        .update_entry(id, input)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Entry"))
}

/// Idempotent: deleting an unknown id still answers 204.
pub async fn delete_entry(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    lock(&state)?.remove_entry(id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_entries(State(state): State<SharedTracker>) -> Result<StatusCode, ApiError> {
    lock(&state)?.clear_entries().map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_entry_projects(
    State(state): State<SharedTracker>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(lock(&state)?.ledger().projects()))
}

pub async fn export_json(State(state): State<SharedTracker>) -> Result<Response, ApiError> {
    let json = lock(&state)?.ledger().export_json().map_err(store_error)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

pub async fn export_csv(State(state): State<SharedTracker>) -> Result<Response, ApiError> {
    let csv = lock(&state)?.ledger().export_csv();
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

// ============================================================
// Derived
// ============================================================

pub async fn get_stats(State(state): State<SharedTracker>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(lock(&state)?.stats_at(chrono::Utc::now())))
}

pub async fn get_dashboard(
    State(state): State<SharedTracker>,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(lock(&state)?.dashboard()))
}

// ============================================================
// Lifecycle
// ============================================================

pub async fn list_active_projects(
    State(state): State<SharedTracker>,
) -> Result<Json<Vec<ActiveProject>>, ApiError> {
    let tracker = lock(&state)?;
    Ok(Json(tracker.lifecycle_state_at(chrono::Utc::now()).active))
}

pub async fn create_project(
    State(state): State<SharedTracker>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<ActiveProject>), ApiError> {
    lock(&state)?
        .add_project(&input.name)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(lifecycle_error)
}

/// Moves the project to the dead history. Unknown ids answer 204.
pub async fn remove_project(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match lock(&state)?.remove_project(id).map_err(store_error)? {
        Some(dead) => Ok(Json(dead).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn list_dead_projects(
    State(state): State<SharedTracker>,
) -> Result<Json<Vec<DeadProject>>, ApiError> {
    let tracker = lock(&state)?;
    Ok(Json(tracker.lifecycle_state_at(chrono::Utc::now()).dead))
}

pub async fn list_ideas(State(state): State<SharedTracker>) -> Result<Json<Vec<Idea>>, ApiError> {
    Ok(Json(lock(&state)?.lifecycle().state().ideas))
}

pub async fn create_idea(
    State(state): State<SharedTracker>,
    Json(input): Json<CreateIdeaInput>,
) -> Result<(StatusCode, Json<Idea>), ApiError> {
    lock(&state)?
        .add_idea(&input.text)
        .map(|i| (StatusCode::CREATED, Json(i)))
        .map_err(lifecycle_error)
}

pub async fn promote_idea(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ActiveProject>), ApiError> {
    lock(&state)?
        .promote_idea(id)
        .map_err(lifecycle_error)?
        .map(|p| (StatusCode::CREATED, Json(p)))
        .ok_or_else(|| ApiError::not_found("Idea"))
}

pub async fn delete_idea(
    State(state): State<SharedTracker>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    lock(&state)?.delete_idea(id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Settings
// ============================================================

pub async fn get_settings(State(state): State<SharedTracker>) -> Result<Json<Settings>, ApiError> {
    Ok(Json(lock(&state)?.settings().get()))
}

pub async fn update_settings(
    State(state): State<SharedTracker>,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<Json<Settings>, ApiError> {
    lock(&state)?
        .settings()
        .update(input)
        .map(Json)
        .map_err(settings_error)
}
