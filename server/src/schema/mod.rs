//! Validation contracts for every entity the service accepts.
//!
//! Static shapes are declared once per entity and exposed through the
//! [`Schema`] trait; [`AttendeeSchema`] is built at runtime from an event's
//! custom field descriptors.

pub mod attendee;
pub mod error;
pub mod event;
pub mod registration;
pub mod rule;
pub mod ticket;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use attendee::{AttendeeSchema, DescriptorError};
pub use error::{FieldError, ValidationErrors};
pub use rule::{ObjectShape, Rule};

/// A type with a declared validation shape.
pub trait Schema: DeserializeOwned {
    fn shape() -> &'static Rule;

    /// Validate `value` and build the normalized instance.
    fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let normalized = Self::shape().validate(value)?;
        serde_json::from_value(normalized).map_err(|e| ValidationErrors::single("", e.to_string()))
    }
}
