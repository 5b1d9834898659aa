use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer, Config};
use crate::handlers::{billing, events, health_check, registrations};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/events/public", get(events::list_public_events))
        .route("/events/:event_id", get(events::get_event))
        .route(
            "/events/:event_id/registrations",
            post(registrations::create_registration).get(registrations::list_registrations),
        )
        .route(
            "/organizations/:organization_id/events",
            post(events::create_event),
        )
        .route("/billing/connect-accounts", post(billing::create_connect_account))
        .route(
            "/billing/connect-accounts/:account_id",
            get(billing::get_onboarding),
        )
        .route(
            "/billing/connect-accounts/:account_id/exit",
            post(billing::exit_onboarding),
        )
        .with_state(state);

    apply_security_headers(api, config.production)
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
