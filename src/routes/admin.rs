use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{fleet, stats};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats::stats))
        .route("/health", get(stats::health))
        .route("/admin/dashboard", get(stats::dashboard))
        .route("/admin/simulate-buses", post(fleet::simulate_buses))
        .route("/admin/seed-data", post(fleet::seed_data))
}
