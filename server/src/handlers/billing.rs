use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::json_body;
use crate::services::onboarding::{OnboardingState, OnboardingView};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAccountRequest {
    #[validate(length(min = 1, message = "Account is required"))]
    pub account_id: String,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub state: OnboardingState,
    pub view: OnboardingView,
}

impl From<OnboardingState> for OnboardingResponse {
    fn from(state: OnboardingState) -> Self {
        let view = state.view();
        Self { state, view }
    }
}

pub async fn create_connect_account(
    State(state): State<AppState>,
    payload: Result<Json<ConnectAccountRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.into()))?;

    let onboarding = state
        .onboarding
        .create_account(state.payments.as_ref(), &request.account_id)
        .await?;
    tracing::info!(
        owner_account_id = %request.account_id,
        connected_account_id = ?onboarding.connected_account_id,
        "Connected account created"
    );

    Ok(success(
        OnboardingResponse::from(onboarding),
        "Connected account created",
    ))
}

pub async fn get_onboarding(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Response, AppError> {
    let onboarding = state.onboarding.state(&account_id);
    Ok(success(
        OnboardingResponse::from(onboarding),
        "Onboarding state retrieved",
    ))
}

pub async fn exit_onboarding(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Response, AppError> {
    let onboarding = state.onboarding.exit_onboarding(&account_id)?;
    tracing::info!(owner_account_id = %account_id, "Account onboarding exited");

    Ok(success(
        OnboardingResponse::from(onboarding),
        "Onboarding exit recorded",
    ))
}
