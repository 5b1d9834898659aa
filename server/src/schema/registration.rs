use std::sync::OnceLock;

use super::event::event_input_shape;
use super::rule::{ObjectShape, Rule};
use super::ticket::issued_ticket_shape;
use super::Schema;
use crate::models::{Registration, RegistrationStatus, RegistrationSummary, User};

pub(crate) fn user_shape() -> ObjectShape {
    ObjectShape::new()
        .field("id", Rule::string())
        .field("name", Rule::string())
        .field("email", Rule::string())
}

pub(crate) fn registration_shape() -> ObjectShape {
    ObjectShape::new()
        .field("id", Rule::string())
        .field("eventId", Rule::string())
        .field("userId", Rule::string())
        .field("status", Rule::one_of(RegistrationStatus::ALL))
        .field("customFields", Rule::record())
        .field("createdAt", Rule::date())
        .field("updatedAt", Rule::date())
        .field("paid", Rule::boolean())
        .field("paymentId", Rule::string().nullable())
        .field("user", user_shape().into_rule())
        .field("event", event_input_shape().into_rule().nullable())
        .field("tickets", Rule::array(issued_ticket_shape().into_rule()))
}

pub(crate) fn registration_summary_shape() -> ObjectShape {
    ObjectShape::new()
        .field("id", Rule::string())
        .field("user", user_shape().into_rule())
        .field("status", Rule::one_of(RegistrationStatus::ALL))
        .field("createdAt", Rule::date())
        .field("updatedAt", Rule::date())
        .field("paid", Rule::boolean())
        .field("paymentId", Rule::string().optional())
}

impl Schema for User {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| user_shape().into_rule())
    }
}

impl Schema for Registration {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| registration_shape().into_rule())
    }
}

impl Schema for RegistrationSummary {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| registration_summary_shape().into_rule())
    }
}
