use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Text,
    Number,
    Select,
    Date,
}

impl CustomFieldType {
    pub const ALL: [&'static str; 4] = ["text", "number", "select", "date"];
}

/// An extra question an organizer adds to an event's registration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Comma-separated choices, used by select fields only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

fn default_required() -> bool {
    true
}

impl CustomFieldDescriptor {
    /// The trimmed pieces of the options string. Blank pieces are kept, so
    /// `"S,,M"` offers an empty choice.
    pub fn option_list(&self) -> Vec<String> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|option| option.trim().to_string())
            .collect()
    }

    /// Whether at least one option is more than whitespace.
    pub fn has_options(&self) -> bool {
        self.option_list().iter().any(|option| !option.is_empty())
    }
}
