use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod billing;
pub mod events;
pub mod registrations;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventhub-api",
    };

    success(payload, "Health check successful")
}

/// Unwrap a JSON body, turning a malformed one into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}
