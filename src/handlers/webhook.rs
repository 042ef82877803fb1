use axum::{body::Bytes, extract::State, http::HeaderMap, response::Json};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Always acknowledges; the gateway retries anything that is not a 200.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.workflow.handle_webhook(&body, signature).await {
        Ok(disposition) => debug!(?disposition, "Webhook processed"),
        Err(e) => error!("Webhook processing error: {}", e),
    }

    Json(json!({ "status": "OK" }))
}
