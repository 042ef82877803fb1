use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use tracing::info;
use validator::Validate;

use crate::dtos::ticket_dtos::{
    CreateOrderRequest, CreateOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::errors::{AppError, Result};
use crate::extractors::AppJson;
use crate::models::ticket::TicketView;
use crate::services::receipt;
use crate::services::ticket_workflow::PaymentOutcome;
use crate::state::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    payload.validate()?;
    info!(
        passengers = payload.passengers,
        from = %payload.from_stop,
        to = %payload.to_stop,
        "Create order request"
    );

    let created = state.workflow.create_order(payload.into()).await?;
    Ok(Json(created.into()))
}

fn download_link(ticket_id: &str) -> String {
    format!("/api/ticket/download/{}", ticket_id)
}

pub async fn verify_payment(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyPaymentRequest>,
) -> Result<Response> {
    payload.validate()?;

    let response = match state.workflow.verify_payment(payload.into()).await? {
        PaymentOutcome::Paid { ticket, .. } => (
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                success: true,
                message: "Payment verified successfully".to_string(),
                download_link: Some(download_link(&ticket.ticket_id)),
                ticket_id: ticket.ticket_id,
                qr_code: ticket.qr_code_data,
                payment_id: ticket.gateway_payment_id,
            }),
        ),
        PaymentOutcome::Failed { ticket_id } => (
            StatusCode::BAD_REQUEST,
            Json(VerifyPaymentResponse {
                success: false,
                message: "Payment verification failed".to_string(),
                ticket_id,
                qr_code: None,
                payment_id: None,
                download_link: None,
            }),
        ),
    };

    Ok(response.into_response())
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketView>> {
    let ticket = state
        .store
        .find_ticket(&ticket_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket"))?;

    Ok(Json(ticket.into()))
}

pub async fn download_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Html<String>> {
    let ticket = state
        .store
        .find_ticket(&ticket_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket"))?;

    Ok(Html(receipt::render_receipt(&ticket)))
}
