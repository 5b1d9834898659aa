use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    sold_out, EventStore, NewRegistration, StoreError, ALREADY_REGISTERED, EVENT_FULL,
};
use crate::models::{
    IssuedTicket, NewEvent, Organization, OrganizationSummary, PublicEvent, Registration,
    RegistrationStatus, RegistrationSummary, SavedEvent, SavedTicket, User,
};

#[derive(Default)]
struct Inner {
    organizations: HashMap<String, Organization>,
    users: HashMap<String, User>,
    events: Vec<SavedEvent>,
    registrations: Vec<Registration>,
    /// Issued ticket count per ticket definition id.
    issued: HashMap<String, u64>,
}

/// Process-local store used by tests and local runs without a database.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_organization(&self, name: &str, logo: Option<&str>) -> Organization {
        let now = Utc::now();
        let organization = Organization {
            id: new_id(),
            name: name.to_string(),
            logo: logo.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .organizations
            .insert(organization.id.clone(), organization.clone());
        organization
    }

    pub async fn add_user(&self, name: &str, email: &str) -> User {
        let user = User {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.inner
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        user
    }
}

fn is_active(registration: &Registration) -> bool {
    registration.status != RegistrationStatus::Rejected
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list_public_events(&self) -> Result<Vec<PublicEvent>, StoreError> {
        let inner = self.inner.read().await;
        let now = Utc::now();

        let mut events: Vec<PublicEvent> = inner
            .events
            .iter()
            .filter(|event| event.event.end_date >= now)
            .filter_map(|event| {
                let organization = inner.organizations.get(&event.organization_id)?;
                let registrations = inner
                    .registrations
                    .iter()
                    .filter(|r| r.event_id == event.id && is_active(r))
                    .count() as u64;
                Some(PublicEvent {
                    event: event.clone(),
                    registrations,
                    organization: OrganizationSummary::from(organization),
                })
            })
            .collect();

        events.sort_by_key(|event| event.event.event.start_date);
        Ok(events)
    }

    async fn find_event(&self, id: &str) -> Result<Option<SavedEvent>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().find(|event| event.id == id).cloned())
    }

    async fn create_event(
        &self,
        organization_id: &str,
        event: NewEvent,
    ) -> Result<SavedEvent, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.organizations.contains_key(organization_id) {
            return Err(StoreError::NotFound(format!(
                "Organization with id '{}' was not found",
                organization_id
            )));
        }

        let now: DateTime<Utc> = Utc::now();
        let NewEvent {
            event,
            custom_fields,
            tickets,
        } = event;
        let saved = SavedEvent {
            id: new_id(),
            organization_id: organization_id.to_string(),
            event,
            created_at: now,
            updated_at: now,
            custom_fields,
            tickets: Some(
                tickets
                    .into_iter()
                    .map(|ticket| SavedTicket {
                        id: new_id(),
                        ticket,
                    })
                    .collect(),
            ),
        };

        inner.events.push(saved.clone());
        Ok(saved)
    }

    async fn create_registration(
        &self,
        registration: NewRegistration,
    ) -> Result<Registration, StoreError> {
        let mut inner = self.inner.write().await;

        let event = inner
            .events
            .iter()
            .find(|event| event.id == registration.event_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "Event with id '{}' was not found",
                    registration.event_id
                ))
            })?;
        let user = inner
            .users
            .get(&registration.user_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "User with id '{}' was not found",
                    registration.user_id
                ))
            })?;

        let existing: Vec<&Registration> = inner
            .registrations
            .iter()
            .filter(|r| r.event_id == event.id && is_active(r))
            .collect();
        if existing.iter().any(|r| r.user_id == user.id) {
            return Err(StoreError::Conflict(ALREADY_REGISTERED.to_string()));
        }
        if let Some(max) = event.event.max_attendees {
            if existing.len() as u64 >= u64::from(max) {
                return Err(StoreError::Conflict(EVENT_FULL.to_string()));
            }
        }

        let definitions = event.tickets.clone().unwrap_or_default();
        let mut issue = Vec::new();
        for selection in &registration.tickets {
            let definition = definitions
                .iter()
                .find(|t| t.id == selection.ticket_id)
                .ok_or_else(|| {
                    StoreError::NotFound(format!(
                        "Ticket with id '{}' was not found",
                        selection.ticket_id
                    ))
                })?;
            let issued = inner.issued.get(&definition.id).copied().unwrap_or(0);
            if issued + u64::from(selection.quantity) > u64::from(definition.ticket.limit) {
                return Err(sold_out(&definition.ticket.name));
            }
            issue.push((definition.clone(), selection.quantity));
        }

        let now = Utc::now();
        let mut tickets = Vec::new();
        for (definition, quantity) in issue {
            *inner.issued.entry(definition.id.clone()).or_insert(0) += u64::from(quantity);
            for _ in 0..quantity {
                tickets.push(IssuedTicket {
                    id: new_id(),
                    event_id: event.id.clone(),
                    user: Some(user.clone()),
                    checked_in_date: None,
                    created_at: now,
                    updated_at: now,
                    category: definition.ticket.category,
                });
            }
        }

        let stored = Registration {
            id: new_id(),
            event_id: event.id.clone(),
            user_id: user.id.clone(),
            status: registration.status,
            custom_fields: registration.custom_fields,
            created_at: now,
            updated_at: now,
            paid: false,
            payment_id: None,
            user,
            event: Some(event.event),
            tickets,
        };
        inner.registrations.push(stored.clone());
        Ok(stored)
    }

    async fn list_registrations(
        &self,
        event_id: &str,
    ) -> Result<Vec<RegistrationSummary>, StoreError> {
        let inner = self.inner.read().await;
        if !inner.events.iter().any(|event| event.id == event_id) {
            return Err(StoreError::NotFound(format!(
                "Event with id '{}' was not found",
                event_id
            )));
        }

        Ok(inner
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .map(RegistrationSummary::from)
            .collect())
    }
}
