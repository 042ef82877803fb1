use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::fleet;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/live-buses", get(fleet::live_buses))
        .route("/bus-stops", get(fleet::bus_stops))
        .route("/submit-report", post(fleet::submit_report))
        .route("/simulate-capacity", post(fleet::simulate_capacity))
}
