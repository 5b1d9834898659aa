use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    sold_out, EventStore, NewRegistration, StoreError, ALREADY_REGISTERED, EVENT_FULL,
};
use crate::models::{
    CustomFieldDescriptor, EventInput, EventType, IssuedTicket, NewEvent, OrganizationSummary,
    PublicEvent, Registration, RegistrationStatus, RegistrationSummary, SavedEvent, SavedTicket,
    TicketCategory, TicketInput, User,
};

const EVENT_COLUMNS: &str = "e.id, e.organization_id, e.title, e.start_date, e.end_date, \
    e.location, e.city, e.state, e.country, e.virtual_link, e.description, e.max_attendees, \
    e.requires_approval, e.open_graph_image, e.event_type, e.custom_fields, e.created_at, \
    e.updated_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    organization_id: Uuid,
    title: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    location: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    virtual_link: Option<String>,
    description: Option<String>,
    max_attendees: Option<i32>,
    requires_approval: bool,
    open_graph_image: Option<String>,
    event_type: String,
    custom_fields: Json<Vec<CustomFieldDescriptor>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    fn into_saved(self, tickets: Vec<SavedTicket>) -> Result<SavedEvent, StoreError> {
        let event_type = EventType::parse(&self.event_type)
            .ok_or_else(|| StoreError::Corrupt(format!("event type '{}'", self.event_type)))?;

        Ok(SavedEvent {
            id: self.id.to_string(),
            organization_id: self.organization_id.to_string(),
            event: EventInput {
                title: self.title,
                start_date: self.start_date,
                end_date: self.end_date,
                location: self.location,
                city: self.city,
                state: self.state,
                country: self.country,
                virtual_link: self.virtual_link,
                description: self.description,
                max_attendees: self.max_attendees.and_then(|n| u32::try_from(n).ok()),
                requires_approval: self.requires_approval,
                open_graph_image: self.open_graph_image,
                event_type,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            custom_fields: self.custom_fields.0,
            tickets: Some(tickets),
        })
    }
}

#[derive(Debug, FromRow)]
struct PublicEventRow {
    #[sqlx(flatten)]
    event: EventRow,
    organization_name: String,
    organization_logo: Option<String>,
    registrations: i64,
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    category: String,
    description: Option<String>,
    price: Decimal,
    ticket_limit: i32,
    tickets_per_purchase: i32,
}

impl TicketRow {
    fn into_saved(self) -> Result<SavedTicket, StoreError> {
        let category = parse_category(&self.category)?;
        Ok(SavedTicket {
            id: self.id.to_string(),
            ticket: TicketInput {
                name: self.name,
                category,
                description: self.description,
                price: self.price.to_f64().unwrap_or_default(),
                limit: u32::try_from(self.ticket_limit).unwrap_or_default(),
                tickets_per_purchase: u32::try_from(self.tickets_per_purchase)
                    .unwrap_or_default(),
            },
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            email: row.email,
        }
    }
}

#[derive(Debug, FromRow)]
struct RegistrationSummaryRow {
    id: Uuid,
    status: String,
    paid: bool,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_email: String,
}

fn parse_category(value: &str) -> Result<TicketCategory, StoreError> {
    TicketCategory::parse(value)
        .ok_or_else(|| StoreError::Corrupt(format!("ticket category '{}'", value)))
}

fn parse_status(value: &str) -> Result<RegistrationStatus, StoreError> {
    RegistrationStatus::parse(value)
        .ok_or_else(|| StoreError::Corrupt(format!("registration status '{}'", value)))
}

/// Ids arrive as strings; anything that is not a UUID cannot exist.
fn parse_id(id: &str, what: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id)
        .map_err(|_| StoreError::NotFound(format!("{} with id '{}' was not found", what, id)))
}

/// Exclusive upper bound of a `NUMERIC(12,2)` column.
fn price_ceiling() -> Decimal {
    Decimal::new(1_000_000_000_000, 2)
}

fn to_decimal(price: f64) -> Result<Decimal, StoreError> {
    Decimal::try_from(price)
        .ok()
        .map(|d| d.round_dp(2))
        .filter(|d| d.abs() < price_ceiling())
        .ok_or_else(|| StoreError::OutOfRange(format!("Ticket price {} cannot be stored", price)))
}

fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::OutOfRange(format!("{} {} cannot be stored", field, value)))
}

/// The ticket as the table keeps it, with the price rounded to cents.
fn stored_ticket(mut ticket: TicketInput) -> Result<(TicketInput, Decimal), StoreError> {
    let price = to_decimal(ticket.price)?;
    ticket.price = price.to_f64().unwrap_or_default();
    Ok((ticket, price))
}

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tickets_for(
        &self,
        event_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<SavedTicket>>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT id, event_id, name, category, description, price, ticket_limit, \
             tickets_per_purchase FROM event_tickets WHERE event_id = ANY($1) \
             ORDER BY position",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tickets: HashMap<Uuid, Vec<SavedTicket>> = HashMap::new();
        for row in rows {
            let event_id = row.event_id;
            tickets.entry(event_id).or_default().push(row.into_saved()?);
        }
        Ok(tickets)
    }

    async fn lock_event(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<EventRow, StoreError> {
        sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events e WHERE e.id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Event with id '{}' was not found", id)))
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list_public_events(&self) -> Result<Vec<PublicEvent>, StoreError> {
        let rows = sqlx::query_as::<_, PublicEventRow>(&format!(
            "SELECT {}, o.name AS organization_name, o.logo AS organization_logo, \
             (SELECT COUNT(*) FROM registrations r \
              WHERE r.event_id = e.id AND r.status <> 'REJECTED') AS registrations \
             FROM events e JOIN organizations o ON o.id = e.organization_id \
             WHERE e.is_public AND e.end_date >= NOW() \
             ORDER BY e.start_date ASC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.event.id).collect();
        let mut tickets = self.tickets_for(&ids).await?;

        let events = rows
            .into_iter()
            .map(|row| -> Result<PublicEvent, StoreError> {
                let event_tickets = tickets.remove(&row.event.id).unwrap_or_default();
                Ok(PublicEvent {
                    event: row.event.into_saved(event_tickets)?,
                    registrations: u64::try_from(row.registrations).unwrap_or_default(),
                    organization: OrganizationSummary {
                        name: row.organization_name,
                        logo: row.organization_logo,
                    },
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        tracing::debug!(count = events.len(), "Loaded public events");
        Ok(events)
    }

    async fn find_event(&self, id: &str) -> Result<Option<SavedEvent>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events e WHERE e.id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tickets = self.tickets_for(&[id]).await?.remove(&id).unwrap_or_default();
                Ok(Some(row.into_saved(tickets)?))
            }
            None => Ok(None),
        }
    }

    async fn create_event(
        &self,
        organization_id: &str,
        event: NewEvent,
    ) -> Result<SavedEvent, StoreError> {
        let organization_id = parse_id(organization_id, "Organization")?;
        let mut tx = self.pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM organizations WHERE id = $1")
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!(
                "Organization with id '{}' was not found",
                organization_id
            )));
        }

        let id = Uuid::new_v4();
        let NewEvent {
            event,
            custom_fields,
            tickets,
        } = event;
        let max_attendees = event
            .max_attendees
            .map(|max| to_i32(max, "Max attendees"))
            .transpose()?;

        let row = sqlx::query_as::<_, EventRow>(
            "INSERT INTO events (id, organization_id, title, start_date, end_date, location, \
             city, state, country, virtual_link, description, max_attendees, \
             requires_approval, open_graph_image, event_type, custom_fields) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING id, organization_id, title, start_date, end_date, location, city, \
             state, country, virtual_link, description, max_attendees, requires_approval, \
             open_graph_image, event_type, custom_fields, created_at, updated_at",
        )
        .bind(id)
        .bind(organization_id)
        .bind(&event.title)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(&event.city)
        .bind(&event.state)
        .bind(&event.country)
        .bind(&event.virtual_link)
        .bind(&event.description)
        .bind(max_attendees)
        .bind(event.requires_approval)
        .bind(&event.open_graph_image)
        .bind(event.event_type.as_str())
        .bind(Json(&custom_fields))
        .fetch_one(&mut *tx)
        .await?;

        let mut saved_tickets = Vec::with_capacity(tickets.len());
        for (position, ticket) in tickets.into_iter().enumerate() {
            let (ticket, price) = stored_ticket(ticket)?;
            let ticket_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO event_tickets (id, event_id, position, name, category, \
                 description, price, ticket_limit, tickets_per_purchase) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(ticket_id)
            .bind(id)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&ticket.name)
            .bind(ticket.category.as_str())
            .bind(&ticket.description)
            .bind(price)
            .bind(to_i32(ticket.limit, "Ticket limit")?)
            .bind(to_i32(ticket.tickets_per_purchase, "Tickets per purchase")?)
            .execute(&mut *tx)
            .await?;

            saved_tickets.push(SavedTicket {
                id: ticket_id.to_string(),
                ticket,
            });
        }

        tx.commit().await?;
        tracing::info!(event_id = %id, tickets = saved_tickets.len(), "Event created");

        row.into_saved(saved_tickets)
    }

    async fn create_registration(
        &self,
        registration: NewRegistration,
    ) -> Result<Registration, StoreError> {
        let event_id = parse_id(&registration.event_id, "Event")?;
        let user_id = parse_id(&registration.user_id, "User")?;
        let mut tx = self.pool.begin().await?;

        let event = Self::lock_event(&mut tx, event_id).await?;

        let user: User =
            sqlx::query_as::<_, UserRow>("SELECT id, name, email FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    StoreError::NotFound(format!("User with id '{}' was not found", user_id))
                })?
                .into();

        let (active, mine): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE user_id = $2) FROM registrations \
             WHERE event_id = $1 AND status <> 'REJECTED'",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if mine > 0 {
            return Err(StoreError::Conflict(ALREADY_REGISTERED.to_string()));
        }
        if let Some(max) = event.max_attendees {
            if active >= i64::from(max) {
                return Err(StoreError::Conflict(EVENT_FULL.to_string()));
            }
        }

        let mut issue = Vec::new();
        for selection in &registration.tickets {
            let ticket_id = parse_id(&selection.ticket_id, "Ticket")?;
            let definition: Option<(String, String, i32, i64)> = sqlx::query_as(
                "SELECT t.name, t.category, t.ticket_limit, \
                 (SELECT COUNT(*) FROM tickets i WHERE i.event_ticket_id = t.id) \
                 FROM event_tickets t WHERE t.id = $1 AND t.event_id = $2",
            )
            .bind(ticket_id)
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (name, category, limit, issued) = definition.ok_or_else(|| {
                StoreError::NotFound(format!("Ticket with id '{}' was not found", ticket_id))
            })?;
            if issued + i64::from(selection.quantity) > i64::from(limit) {
                return Err(sold_out(&name));
            }
            issue.push((ticket_id, parse_category(&category)?, selection.quantity));
        }

        let id = Uuid::new_v4();
        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO registrations (id, event_id, user_id, status, custom_fields) \
             VALUES ($1, $2, $3, $4, $5) RETURNING created_at, updated_at",
        )
        .bind(id)
        .bind(event_id)
        .bind(user_id)
        .bind(registration.status.as_str())
        .bind(Json(&registration.custom_fields))
        .fetch_one(&mut *tx)
        .await?;

        let mut tickets = Vec::new();
        for (ticket_id, category, quantity) in issue {
            for _ in 0..quantity {
                let issued_id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO tickets (id, event_id, event_ticket_id, registration_id, \
                     user_id, category, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
                )
                .bind(issued_id)
                .bind(event_id)
                .bind(ticket_id)
                .bind(id)
                .bind(user_id)
                .bind(category.as_str())
                .bind(created_at)
                .execute(&mut *tx)
                .await?;

                tickets.push(IssuedTicket {
                    id: issued_id.to_string(),
                    event_id: event_id.to_string(),
                    user: Some(user.clone()),
                    checked_in_date: None,
                    created_at,
                    updated_at: created_at,
                    category,
                });
            }
        }

        tx.commit().await?;
        tracing::info!(
            registration_id = %id,
            event_id = %event_id,
            tickets = tickets.len(),
            "Registration stored"
        );

        let saved = event.into_saved(Vec::new())?;
        Ok(Registration {
            id: id.to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status: registration.status,
            custom_fields: registration.custom_fields,
            created_at,
            updated_at,
            paid: false,
            payment_id: None,
            user,
            event: Some(saved.event),
            tickets,
        })
    }

    async fn list_registrations(
        &self,
        event_id: &str,
    ) -> Result<Vec<RegistrationSummary>, StoreError> {
        let event_id = parse_id(event_id, "Event")?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!(
                "Event with id '{}' was not found",
                event_id
            )));
        }

        let rows = sqlx::query_as::<_, RegistrationSummaryRow>(
            "SELECT r.id, r.status, r.paid, r.payment_id, r.created_at, r.updated_at, \
             u.id AS user_id, u.name AS user_name, u.email AS user_email \
             FROM registrations r JOIN users u ON u.id = r.user_id \
             WHERE r.event_id = $1 ORDER BY r.created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<RegistrationSummary, StoreError> {
                Ok(RegistrationSummary {
                    id: row.id.to_string(),
                    user: User {
                        id: row.user_id.to_string(),
                        name: row.user_name,
                        email: row.user_email,
                    },
                    status: parse_status(&row.status)?,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    paid: row.paid,
                    payment_id: row.payment_id,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(price: f64, limit: u32) -> TicketInput {
        TicketInput {
            name: "General".to_string(),
            category: TicketCategory::General,
            description: None,
            price,
            limit,
            tickets_per_purchase: 1,
        }
    }

    #[test]
    fn test_stored_ticket_reports_the_rounded_price() {
        let (ticket, price) = stored_ticket(ticket(19.999, 10)).unwrap();

        assert_eq!(price, Decimal::new(2000, 2));
        assert_eq!(ticket.price, 20.0);
    }

    #[test]
    fn test_price_ceiling_matches_column() {
        assert_eq!(price_ceiling().to_string(), "10000000000.00");
        assert!(to_decimal(9_999_999_999.99).is_ok());
        assert!(matches!(to_decimal(1e10), Err(StoreError::OutOfRange(_))));
    }

    #[test]
    fn test_counts_are_rejected_instead_of_clamped() {
        assert_eq!(to_i32(2_147_483_647, "Ticket limit").unwrap(), i32::MAX);

        let err = to_i32(u32::MAX, "Ticket limit").unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
        assert_eq!(err.to_string(), "Ticket limit 4294967295 cannot be stored");
    }
}
