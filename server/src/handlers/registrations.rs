use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use super::json_body;
use crate::services::registration::{self, RegistrationRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_registration(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(payload)?;
    let stored = registration::register(state.events.as_ref(), &event_id, request).await?;

    Ok(created(stored, "Registration created"))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let registrations = state.events.list_registrations(&event_id).await?;
    Ok(success(registrations, "Registrations retrieved"))
}
