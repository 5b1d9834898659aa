use std::collections::HashSet;
use std::sync::OnceLock;

use serde_json::{json, Map, Value};

use super::error::FieldError;
use super::rule::{ObjectShape, Rule};
use super::ticket::{saved_ticket_shape, ticket_input_shape, MAX_COUNT};
use super::Schema;
use crate::models::{
    CustomFieldDescriptor, CustomFieldType, EventInput, EventType, NewEvent, PublicEvent,
    SavedEvent,
};

pub(crate) fn event_input_shape() -> ObjectShape {
    ObjectShape::new()
        .field("title", Rule::string().min_len(1, "Title is required"))
        .field("startDate", Rule::date().coerce())
        .field("endDate", Rule::date().coerce())
        .field("location", Rule::string().optional().nullable())
        .field("city", Rule::string().optional().nullable())
        .field("state", Rule::string().optional().nullable())
        .field("country", Rule::string().optional().nullable())
        .field(
            "virtualLink",
            Rule::string().empty_as_null().url().optional().nullable(),
        )
        .field("description", Rule::string().optional())
        .field(
            "maxAttendees",
            Rule::number()
                .int()
                .positive()
                .max(MAX_COUNT, "Max attendees must be at most 2147483647")
                .optional()
                .nullable(),
        )
        .field("requiresApproval", Rule::boolean().default_value(json!(false)))
        .field("openGraphImage", Rule::string().optional().nullable())
        .field("type", Rule::one_of(EventType::ALL))
}

fn select_needs_options(fields: &Map<String, Value>) -> Vec<FieldError> {
    let is_select = fields.get("type").and_then(Value::as_str) == Some("select");
    let has_option = fields
        .get("options")
        .and_then(Value::as_str)
        .is_some_and(|options| options.split(',').any(|o| !o.trim().is_empty()));

    if is_select && !has_option {
        vec![FieldError::new(
            "options",
            "Select fields need at least one option",
        )]
    } else {
        Vec::new()
    }
}

pub(crate) fn custom_field_shape() -> ObjectShape {
    ObjectShape::new()
        .field("name", Rule::string().min_len(1, "Field name is required"))
        .field("type", Rule::one_of(CustomFieldType::ALL))
        .field("required", Rule::boolean().default_value(json!(true)))
        .field("options", Rule::string().optional())
        .refine(select_needs_options)
}

fn unique_field_names(fields: &Map<String, Value>) -> Vec<FieldError> {
    let Some(custom_fields) = fields.get("customFields").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    custom_fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let name = field.get("name").and_then(Value::as_str)?;
            (!seen.insert(name)).then(|| {
                FieldError::new(
                    format!("customFields.{}.name", index),
                    "Custom field names must be unique",
                )
            })
        })
        .collect()
}

pub(crate) fn new_event_shape() -> ObjectShape {
    event_input_shape()
        .field(
            "customFields",
            Rule::array(custom_field_shape().into_rule())
                .default_value(json!([]))
                .null_as_default(),
        )
        .field(
            "tickets",
            Rule::array(ticket_input_shape().into_rule())
                .default_value(json!([]))
                .null_as_default(),
        )
        .refine(unique_field_names)
}

pub(crate) fn saved_event_shape() -> ObjectShape {
    event_input_shape()
        .field("id", Rule::string())
        .field("organizationId", Rule::string())
        .field("createdAt", Rule::date())
        .field("updatedAt", Rule::date())
        .field(
            "customFields",
            Rule::array(custom_field_shape().into_rule())
                .default_value(json!([]))
                .null_as_default(),
        )
        .field(
            "tickets",
            Rule::array(saved_ticket_shape().into_rule())
                .optional()
                .nullable(),
        )
}

pub(crate) fn public_event_shape() -> ObjectShape {
    saved_event_shape()
        .field("registrations", Rule::number().int().min(0.0, "Registrations cannot be negative"))
        .field(
            "organization",
            ObjectShape::new()
                .field("logo", Rule::string().nullable())
                .field("name", Rule::string())
                .into_rule(),
        )
}

impl Schema for EventInput {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| event_input_shape().into_rule())
    }
}

impl Schema for NewEvent {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| new_event_shape().into_rule())
    }
}

impl Schema for SavedEvent {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| saved_event_shape().into_rule())
    }
}

impl Schema for PublicEvent {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| public_event_shape().into_rule())
    }
}

impl Schema for CustomFieldDescriptor {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| custom_field_shape().into_rule())
    }
}
