use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::database::seed;
use crate::dtos::fleet_dtos::{SimulationResponse, StopReportRequest, StopReportResponse};
use crate::errors::{AppError, Result};
use crate::extractors::AppJson;
use crate::models::{
    bus::{BusMovement, BusOccupancy, LiveBusView},
    bus_stop::{BusStopView, StopReport},
};
use crate::services::fleet_simulator;
use crate::state::AppState;

const LIVE_BUS_LIMIT: i64 = 15;

pub async fn live_buses(State(state): State<AppState>) -> Result<Json<Value>> {
    let buses = state.store.list_active_buses(Some(LIVE_BUS_LIMIT)).await?;
    let buses: Vec<LiveBusView> = buses.into_iter().map(LiveBusView::from).collect();

    Ok(Json(json!({
        "success": true,
        "timestamp": Utc::now().to_rfc3339(),
        "count": buses.len(),
        "buses": buses,
    })))
}

pub async fn bus_stops(State(state): State<AppState>) -> Result<Json<Value>> {
    let stops: Vec<BusStopView> = state
        .store
        .list_stops()
        .await?
        .into_iter()
        .map(BusStopView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": stops.len(),
        "stops": stops,
    })))
}

pub async fn submit_report(
    State(state): State<AppState>,
    AppJson(payload): AppJson<StopReportRequest>,
) -> Result<Json<StopReportResponse>> {
    if payload.stop.trim().is_empty() {
        return Err(AppError::invalid_data("stop is required"));
    }

    if let Some(report) = StopReport::parse(&payload.kind) {
        let found = state.store.record_stop_report(payload.stop.trim(), report).await?;
        if !found {
            warn!(stop = %payload.stop, "Report for unknown stop");
        }
    }

    let report_id = format!("REP{:08}", Utc::now().timestamp_millis() % 100_000_000);
    info!(
        report_id = %report_id,
        kind = %payload.kind,
        stop = %payload.stop,
        user_id = payload.user_id.as_deref().unwrap_or("anonymous"),
        has_description = payload.description.is_some(),
        "Stop report submitted"
    );

    Ok(Json(StopReportResponse {
        success: true,
        message: "Report submitted successfully".to_string(),
        report_id,
    }))
}

pub async fn simulate_buses(State(state): State<AppState>) -> Result<Json<SimulationResponse>> {
    let buses = state.store.list_active_buses(None).await?;
    let stops = state.store.list_stops().await?;

    let moves: Vec<(String, BusMovement)> = {
        let mut rng = rand::thread_rng();
        buses
            .iter()
            .map(|bus| (bus.bus_id.clone(), fleet_simulator::step_movement(bus, &stops, &mut rng)))
            .collect()
    };

    for (bus_id, movement) in &moves {
        state.store.update_bus_movement(bus_id, movement).await?;
    }

    info!(count = moves.len(), "Bus locations updated");
    Ok(Json(SimulationResponse {
        success: true,
        message: "Bus locations updated".to_string(),
        updated_count: moves.len(),
    }))
}

pub async fn simulate_capacity(State(state): State<AppState>) -> Result<Json<SimulationResponse>> {
    let buses = state.store.list_active_buses(None).await?;
    let hour = fleet_simulator::local_hour(Utc::now());

    let updates: Vec<(String, BusOccupancy)> = {
        let mut rng = rand::thread_rng();
        buses
            .iter()
            .map(|bus| (bus.bus_id.clone(), fleet_simulator::step_occupancy(bus, hour, &mut rng)))
            .collect()
    };

    for (bus_id, occupancy) in &updates {
        state.store.update_bus_occupancy(bus_id, occupancy).await?;
    }

    info!(count = updates.len(), hour, "Bus occupancy updated");
    Ok(Json(SimulationResponse {
        success: true,
        message: "Bus capacity updated".to_string(),
        updated_count: updates.len(),
    }))
}

pub async fn seed_data(State(state): State<AppState>) -> Result<Json<Value>> {
    let buses = seed::demo_buses();
    let stops = seed::demo_stops();
    let (bus_count, stop_count) = (buses.len(), stops.len());

    state.store.replace_fleet(buses, stops).await?;

    info!(buses = bus_count, stops = stop_count, "Demo fleet seeded");
    Ok(Json(json!({
        "success": true,
        "message": "Sample data seeded successfully",
        "buses": bus_count,
        "stops": stop_count,
    })))
}
