use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::EventInput;
use super::ticket::IssuedTicket;
use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const ALL: [&'static str; 3] = ["PENDING", "APPROVED", "REJECTED"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Approved => "APPROVED",
            RegistrationStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(RegistrationStatus::Pending),
            "APPROVED" => Some(RegistrationStatus::Approved),
            "REJECTED" => Some(RegistrationStatus::Rejected),
            _ => None,
        }
    }

    /// Status a new registration starts in.
    pub fn initial(requires_approval: bool) -> Self {
        if requires_approval {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::Approved
        }
    }
}

/// One attendee's submission against an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub custom_fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid: bool,
    pub payment_id: Option<String>,
    pub user: User,
    pub event: Option<EventInput>,
    pub tickets: Vec<IssuedTicket>,
}

/// Row of an organizer's attendee list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub id: String,
    pub user: User,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl From<&Registration> for RegistrationSummary {
    fn from(value: &Registration) -> Self {
        Self {
            id: value.id.clone(),
            user: value.user.clone(),
            status: value.status,
            created_at: value.created_at,
            updated_at: value.updated_at,
            paid: value.paid,
            payment_id: value.payment_id.clone(),
        }
    }
}
