use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::OrganizationSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Organization> for OrganizationSummary {
    fn from(value: &Organization) -> Self {
        Self {
            name: value.name.clone(),
            logo: value.logo.clone(),
        }
    }
}
