use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::custom_field::CustomFieldDescriptor;
use super::ticket::{SavedTicket, TicketInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Online,
    InPerson,
}

impl EventType {
    pub const ALL: [&'static str; 2] = ["ONLINE", "IN_PERSON"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Online => "ONLINE",
            EventType::InPerson => "IN_PERSON",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ONLINE" => Some(EventType::Online),
            "IN_PERSON" => Some(EventType::InPerson),
            _ => None,
        }
    }
}

/// Organizer-authored event details shared by every event shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub virtual_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
    pub requires_approval: bool,
    #[serde(default)]
    pub open_graph_image: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

/// Submission used to create an event together with its registration
/// questions and ticket definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(flatten)]
    pub event: EventInput,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDescriptor>,
    #[serde(default)]
    pub tickets: Vec<TicketInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEvent {
    pub id: String,
    pub organization_id: String,
    #[serde(flatten)]
    pub event: EventInput,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDescriptor>,
    #[serde(default)]
    pub tickets: Option<Vec<SavedTicket>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub name: String,
    pub logo: Option<String>,
}

/// A listed event with its attendance count and host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicEvent {
    #[serde(flatten)]
    pub event: SavedEvent,
    pub registrations: u64,
    pub organization: OrganizationSummary,
}
