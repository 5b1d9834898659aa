//! Event data source.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    NewEvent, PublicEvent, Registration, RegistrationStatus, RegistrationSummary, SavedEvent,
};

pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A value the storage columns cannot represent.
    #[error("{0}")]
    OutOfRange(String),

    #[error("Stored data is invalid: {0}")]
    Corrupt(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Tickets of one definition requested with a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSelection {
    pub ticket_id: String,
    pub quantity: u32,
}

/// A registration whose answers were already validated against the event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub custom_fields: Map<String, Value>,
    pub tickets: Vec<TicketSelection>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Public events that have not ended yet, soonest first.
    async fn list_public_events(&self) -> Result<Vec<PublicEvent>, StoreError>;

    async fn find_event(&self, id: &str) -> Result<Option<SavedEvent>, StoreError>;

    async fn create_event(
        &self,
        organization_id: &str,
        event: NewEvent,
    ) -> Result<SavedEvent, StoreError>;

    /// Store a registration and issue its tickets. Fails with
    /// [`StoreError::Conflict`] when the event or a ticket definition is at
    /// capacity, or the user is already registered.
    async fn create_registration(
        &self,
        registration: NewRegistration,
    ) -> Result<Registration, StoreError>;

    async fn list_registrations(
        &self,
        event_id: &str,
    ) -> Result<Vec<RegistrationSummary>, StoreError>;
}

pub(crate) const EVENT_FULL: &str = "Event is full";
pub(crate) const ALREADY_REGISTERED: &str = "User is already registered for this event";

pub(crate) fn sold_out(ticket_name: &str) -> StoreError {
    StoreError::Conflict(format!("Not enough '{}' tickets left", ticket_name))
}
