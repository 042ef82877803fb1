use axum::{extract::State, response::Json};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};

use crate::errors::Result;
use crate::models::ticket::TicketSummary;
use crate::state::AppState;

const RECENT_TICKETS: i64 = 10;
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Midnight of the current Bengaluru day, in UTC.
pub fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(ist) = FixedOffset::east_opt(IST_OFFSET_SECS) else {
        return now;
    };
    let local_midnight = now
        .with_timezone(&ist)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| ist.from_local_datetime(&naive).single());

    local_midnight.map_or(now, |midnight| midnight.with_timezone(&Utc))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let store = &state.store;

    Ok(Json(json!({
        "success": true,
        "stats": {
            "totalTickets": store.count_tickets(None).await?,
            "totalRevenue": store.paid_revenue(None).await?,
            "activeBuses": store.count_active_buses().await?,
            "totalUsers": store.count_users().await?,
            "activeStops": store.count_stops().await?,
        }
    })))
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<Value>> {
    let store = &state.store;
    let today = start_of_local_day(Utc::now());

    let recent: Vec<TicketSummary> = store
        .recent_tickets(RECENT_TICKETS)
        .await?
        .into_iter()
        .map(TicketSummary::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "dashboard": {
            "todaysTickets": store.count_tickets(Some(today)).await?,
            "todaysRevenue": store.paid_revenue(Some(today)).await?,
            "totalUsers": store.count_users().await?,
            "activeBuses": store.count_active_buses().await?,
            "recentTickets": recent,
        }
    })))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "Bengaluru Bus System API",
        "storage": state.store.backend(),
        "paymentGateway": !state.config.razorpay_key_id.is_empty(),
        "email": state.config.smtp.is_some(),
    }))
}
