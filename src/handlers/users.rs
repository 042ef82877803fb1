use axum::{extract::State, response::Json};
use tracing::info;
use validator::Validate;

use crate::dtos::user_dtos::{RegisterRequest, RegisterResponse};
use crate::errors::{AppError, Result};
use crate::extractors::AppJson;
use crate::models::user::{User, UserResponse};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    payload.validate()?;

    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let phone = payload.phone.trim().to_string();
    if name.is_empty() || phone.is_empty() {
        return Err(AppError::invalid_data("name and phone are required"));
    }

    // Fast path; the unique indexes still catch concurrent registrations.
    if state
        .store
        .find_user_by_email_or_phone(&email, &phone)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateUser);
    }

    let user = User::new(name, email, phone);
    state.store.insert_user(&user).await?;

    info!(user_id = %user.id, "User registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "User registered successfully".to_string(),
        user_id: user.id.to_hex(),
        user: UserResponse::from(&user),
    }))
}
