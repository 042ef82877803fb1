use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{tickets, webhook};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(tickets::create_order))
        .route("/verify-payment", post(tickets::verify_payment))
        .route("/webhook", post(webhook::razorpay_webhook))
        .route("/razorpay-webhook", post(webhook::razorpay_webhook))
        .route("/ticket/:ticket_id", get(tickets::get_ticket))
        .route("/ticket/download/:ticket_id", get(tickets::download_ticket))
}
