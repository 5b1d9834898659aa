//! Attendee registration against an event.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::models::{Registration, RegistrationStatus, SavedEvent};
use crate::repository::{EventStore, NewRegistration, TicketSelection};
use crate::schema::{AttendeeSchema, FieldError, ValidationErrors};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "User is required"))]
    pub user_id: String,
    #[serde(default = "empty_answers")]
    pub custom_fields: Value,
    #[serde(default)]
    #[validate(nested)]
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    #[validate(length(min = 1, message = "Ticket is required"))]
    pub ticket_id: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

fn empty_answers() -> Value {
    Value::Object(Map::new())
}

/// Check requested tickets against the event's ticket definitions.
fn check_tickets(event: &SavedEvent, requested: &[TicketRequest]) -> Vec<FieldError> {
    let definitions = event.tickets.as_deref().unwrap_or_default();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for (index, request) in requested.iter().enumerate() {
        if !seen.insert(request.ticket_id.as_str()) {
            errors.push(FieldError::new(
                format!("tickets.{}.ticketId", index),
                "Ticket selected more than once",
            ));
            continue;
        }
        match definitions.iter().find(|t| t.id == request.ticket_id) {
            None => errors.push(FieldError::new(
                format!("tickets.{}.ticketId", index),
                "Unknown ticket",
            )),
            Some(definition) if request.quantity > definition.ticket.tickets_per_purchase => {
                errors.push(FieldError::new(
                    format!("tickets.{}.quantity", index),
                    format!(
                        "At most {} tickets per purchase",
                        definition.ticket.tickets_per_purchase
                    ),
                ))
            }
            Some(_) => {}
        }
    }

    errors
}

/// Validate a registration request against the event's custom fields and
/// tickets, then store it.
pub async fn register(
    store: &dyn EventStore,
    event_id: &str,
    request: RegistrationRequest,
) -> Result<Registration, AppError> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.into()))?;

    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with id '{}' was not found", event_id)))?;

    let schema = AttendeeSchema::build(&event.custom_fields).map_err(|e| {
        tracing::error!(event_id, error = %e, "Event has unusable custom fields");
        AppError::InternalServerError(e.to_string())
    })?;

    let answers = schema
        .validate(&request.custom_fields)
        .map_err(|e| e.prefixed("customFields"));
    let ticket_errors = check_tickets(&event, &request.tickets);

    let answers = match (answers, ValidationErrors::from_vec(ticket_errors)) {
        (Ok(answers), None) => answers,
        (Ok(_), Some(errors)) | (Err(errors), None) => {
            return Err(AppError::InvalidInput(errors))
        }
        (Err(answer_errors), Some(ticket_errors)) => {
            return Err(AppError::InvalidInput(answer_errors.merge(ticket_errors)))
        }
    };

    let registration = NewRegistration {
        event_id: event.id.clone(),
        user_id: request.user_id,
        status: RegistrationStatus::initial(event.event.requires_approval),
        custom_fields: answers,
        tickets: request
            .tickets
            .into_iter()
            .map(|t| TicketSelection {
                ticket_id: t.ticket_id,
                quantity: t.quantity,
            })
            .collect(),
    };

    let stored = store.create_registration(registration).await?;
    tracing::info!(
        event_id = %stored.event_id,
        registration_id = %stored.id,
        status = stored.status.as_str(),
        "Attendee registered"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CustomFieldDescriptor, CustomFieldType, EventInput, EventType, NewEvent, TicketCategory,
        TicketInput, User,
    };
    use crate::repository::InMemoryEventStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    async fn setup(requires_approval: bool) -> (InMemoryEventStore, SavedEvent, User) {
        let store = InMemoryEventStore::new();
        let org = store.add_organization("Rustaceans", None).await;
        let user = store.add_user("Ada", "ada@example.com").await;
        let event = store
            .create_event(
                &org.id,
                NewEvent {
                    event: EventInput {
                        title: "RustConf".to_string(),
                        start_date: Utc.with_ymd_and_hms(2031, 9, 1, 9, 0, 0).unwrap(),
                        end_date: Utc.with_ymd_and_hms(2031, 9, 3, 18, 0, 0).unwrap(),
                        location: None,
                        city: None,
                        state: None,
                        country: None,
                        virtual_link: None,
                        description: None,
                        max_attendees: None,
                        requires_approval,
                        open_graph_image: None,
                        event_type: EventType::InPerson,
                    },
                    custom_fields: vec![CustomFieldDescriptor {
                        name: "t-shirt size".to_string(),
                        field_type: CustomFieldType::Select,
                        required: true,
                        options: Some("S, M, L".to_string()),
                    }],
                    tickets: vec![TicketInput {
                        name: "General".to_string(),
                        category: TicketCategory::General,
                        description: None,
                        price: 0.0,
                        limit: 100,
                        tickets_per_purchase: 2,
                    }],
                },
            )
            .await
            .unwrap();
        (store, event, user)
    }

    fn request(user: &User, answers: Value, tickets: Vec<TicketRequest>) -> RegistrationRequest {
        RegistrationRequest {
            user_id: user.id.clone(),
            custom_fields: answers,
            tickets,
        }
    }

    #[tokio::test]
    async fn test_register_with_valid_answers() {
        let (store, event, user) = setup(false).await;
        let ticket_id = event.tickets.as_ref().unwrap()[0].id.clone();

        let registration = register(
            &store,
            &event.id,
            request(
                &user,
                json!({ "t-shirt size": "M", "email": "ada@example.com" }),
                vec![TicketRequest {
                    ticket_id,
                    quantity: 2,
                }],
            ),
        )
        .await
        .unwrap();

        assert_eq!(registration.status, RegistrationStatus::Approved);
        assert_eq!(registration.custom_fields["t-shirt size"], json!("M"));
        assert_eq!(registration.tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_approval_events_start_pending() {
        let (store, event, user) = setup(true).await;

        let answers = json!({ "t-shirt size": "S" });
        let registration = register(&store, &event.id, request(&user, answers, vec![]))
            .await
            .unwrap();

        assert_eq!(registration.status, RegistrationStatus::Pending);
    }

    #[tokio::test]
    async fn test_answer_and_ticket_errors_are_reported_together() {
        let (store, event, user) = setup(false).await;
        let ticket_id = event.tickets.as_ref().unwrap()[0].id.clone();

        let err = register(
            &store,
            &event.id,
            request(
                &user,
                json!({ "t-shirt size": "XL" }),
                vec![
                    TicketRequest {
                        ticket_id,
                        quantity: 3,
                    },
                    TicketRequest {
                        ticket_id: "nope".to_string(),
                        quantity: 1,
                    },
                ],
            ),
        )
        .await
        .unwrap_err();

        let errors = match err {
            AppError::InvalidInput(errors) => errors,
            other => panic!("expected field errors, got {:?}", other),
        };
        assert!(errors.contains("customFields.t-shirt size"));
        assert_eq!(
            errors.field("tickets.0.quantity").unwrap().message,
            "At most 2 tickets per purchase"
        );
        assert_eq!(errors.field("tickets.1.ticketId").unwrap().message, "Unknown ticket");
    }

    #[tokio::test]
    async fn test_missing_required_answer() {
        let (store, event, user) = setup(false).await;

        let err = register(&store, &event.id, request(&user, json!({}), vec![]))
            .await
            .unwrap_err();

        let errors = match err {
            AppError::InvalidInput(errors) => errors,
            other => panic!("expected field errors, got {:?}", other),
        };
        assert_eq!(
            errors.field("customFields.t-shirt size").unwrap().message,
            "Required"
        );
    }

    #[tokio::test]
    async fn test_request_body_is_checked_first() {
        let (store, event, _) = setup(false).await;

        let err = register(
            &store,
            &event.id,
            RegistrationRequest {
                user_id: String::new(),
                custom_fields: json!({}),
                tickets: vec![TicketRequest {
                    ticket_id: "x".to_string(),
                    quantity: 0,
                }],
            },
        )
        .await
        .unwrap_err();

        let errors = match err {
            AppError::InvalidInput(errors) => errors,
            other => panic!("expected field errors, got {:?}", other),
        };
        assert_eq!(errors.field("userId").unwrap().message, "User is required");
        assert_eq!(
            errors.field("tickets.0.quantity").unwrap().message,
            "Quantity must be at least 1"
        );
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let (store, _, user) = setup(false).await;

        let err = register(&store, "missing", request(&user, json!({}), vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
