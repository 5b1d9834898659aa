use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_body;
use crate::models::{NewEvent, PublicEvent};
use crate::schema::Schema;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub const LISTING_HEADER: &str = "Events near you";
pub const NO_EVENTS_FOUND: &str = "No events found";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    #[serde(default = "show_header_default")]
    pub show_header: bool,
}

fn show_header_default() -> bool {
    true
}

/// The public events page: optional header, the events, and a message
/// shown in place of an empty list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEventsListing {
    pub header: Option<&'static str>,
    pub events: Vec<PublicEvent>,
    pub empty_message: Option<&'static str>,
}

impl PublicEventsListing {
    pub fn new(events: Vec<PublicEvent>, show_header: bool) -> Self {
        Self {
            header: show_header.then_some(LISTING_HEADER),
            empty_message: events.is_empty().then_some(NO_EVENTS_FOUND),
            events,
        }
    }
}

pub async fn list_public_events(
    State(state): State<AppState>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let events = state.events.list_public_events().await?;
    tracing::debug!(count = events.len(), "Listing public events");

    Ok(success(
        PublicEventsListing::new(events, query.show_header),
        "Public events retrieved",
    ))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let event = state
        .events
        .find_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with id '{}' was not found", event_id)))?;

    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let body = json_body(payload)?;
    let event = NewEvent::parse(&body).map_err(AppError::InvalidInput)?;

    let saved = state.events.create_event(&organization_id, event).await?;
    tracing::info!(
        event_id = %saved.id,
        organization_id = %saved.organization_id,
        "Event created"
    );

    Ok(created(saved, "Event created"))
}
