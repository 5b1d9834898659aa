//! Registration answer validation built from an event's custom fields.
//!
//! The questions an organizer adds to an event are only known at runtime,
//! so the shape for one attendee's answers is assembled per event: a base
//! shape holding an optional email, plus one rule per descriptor keyed by
//! the descriptor's name.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use super::error::ValidationErrors;
use super::rule::{ObjectShape, Rule};
use crate::models::{CustomFieldDescriptor, CustomFieldType};

pub const EMAIL_FIELD: &str = "email";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Custom field name is empty")]
    EmptyName,

    #[error("Select field '{0}' has no options")]
    EmptyOptions(String),

    #[error("Custom field '{0}' is defined more than once")]
    DuplicateName(String),
}

/// Validator for one registration's answer mapping.
#[derive(Debug, Clone)]
pub struct AttendeeSchema {
    shape: Rule,
}

impl AttendeeSchema {
    pub fn build(descriptors: &[CustomFieldDescriptor]) -> Result<Self, DescriptorError> {
        let mut shape = base_shape();
        let mut seen = HashSet::new();

        for descriptor in descriptors {
            if descriptor.name.is_empty() {
                return Err(DescriptorError::EmptyName);
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(DescriptorError::DuplicateName(descriptor.name.clone()));
            }

            let leaf = field_rule(descriptor)?;
            let rule = if descriptor.required {
                leaf
            } else {
                leaf.optional()
            };
            shape.insert(descriptor.name.clone(), rule);
        }

        tracing::debug!(fields = descriptors.len(), "Built attendee schema");

        Ok(Self {
            shape: shape.into_rule(),
        })
    }

    /// Check every answer and return the normalized mapping, or one error
    /// per invalid or missing required field.
    pub fn validate(&self, answers: &Value) -> Result<Map<String, Value>, ValidationErrors> {
        match self.shape.validate(answers)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(ValidationErrors::single("", "Expected object")),
        }
    }
}

fn base_shape() -> ObjectShape {
    ObjectShape::new().field(
        EMAIL_FIELD,
        Rule::string().email("Invalid email address").optional(),
    )
}

fn field_rule(descriptor: &CustomFieldDescriptor) -> Result<Rule, DescriptorError> {
    let rule = match descriptor.field_type {
        CustomFieldType::Text => Rule::string(),
        CustomFieldType::Number => Rule::number(),
        CustomFieldType::Date => Rule::date(),
        CustomFieldType::Select => {
            if !descriptor.has_options() {
                return Err(DescriptorError::EmptyOptions(descriptor.name.clone()));
            }
            Rule::one_of(descriptor.option_list())
        }
    };
    Ok(rule)
}
