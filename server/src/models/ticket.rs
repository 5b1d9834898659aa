use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    General,
    Vip,
    Backstage,
}

impl TicketCategory {
    pub const ALL: [&'static str; 3] = ["GENERAL", "VIP", "BACKSTAGE"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::General => "GENERAL",
            TicketCategory::Vip => "VIP",
            TicketCategory::Backstage => "BACKSTAGE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GENERAL" => Some(TicketCategory::General),
            "VIP" => Some(TicketCategory::Vip),
            "BACKSTAGE" => Some(TicketCategory::Backstage),
            _ => None,
        }
    }
}

/// A kind of ticket an event sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInput {
    pub name: String,
    pub category: TicketCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub limit: u32,
    pub tickets_per_purchase: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTicket {
    pub id: String,
    #[serde(flatten)]
    pub ticket: TicketInput,
}

/// One ticket held by an attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTicket {
    pub id: String,
    pub event_id: String,
    pub user: Option<User>,
    pub checked_in_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: TicketCategory,
}
