mod handlers;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::SqliteStore;
use crate::tracker::Tracker;

/// One tracker shared by every request. The mutex makes each
/// read-modify-write of the store a single-writer critical section.
pub type SharedTracker = Arc<Mutex<Tracker<SqliteStore>>>;

pub fn create_router(store: SqliteStore) -> Router {
    let state: SharedTracker = Arc::new(Mutex::new(Tracker::new(store)));

    let api = Router::new()
        // Ledger
        .route("/entries", get(handlers::list_entries))
        .route("/entries", post(handlers::create_entry))
        .route("/entries", delete(handlers::clear_entries))
        .route("/entries/projects", get(handlers::list_entry_projects))
        .route("/entries/export/json", get(handlers::export_json))
        .route("/entries/export/csv", get(handlers::export_csv))
        .route("/entries/{id}", get(handlers::get_entry))
        .route("/entries/{id}", put(handlers::update_entry))
        .route("/entries/{id}", delete(handlers::delete_entry))
        // Derived
        .route("/stats", get(handlers::get_stats))
        .route("/dashboard", get(handlers::get_dashboard))
        // Lifecycle
        .route("/projects", get(handlers::list_active_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}", delete(handlers::remove_project))
        .route("/dead-projects", get(handlers::list_dead_projects))
        .route("/ideas", get(handlers::list_ideas))
        .route("/ideas", post(handlers::create_idea))
        .route("/ideas/{id}", delete(handlers::delete_idea))
        .route("/ideas/{id}/promote", post(handlers::promote_idea))
        // Settings
        .route("/settings", get(handlers::get_settings))
        .route("/settings", put(handlers::update_settings))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
