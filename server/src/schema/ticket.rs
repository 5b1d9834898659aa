use std::sync::OnceLock;

use super::registration::user_shape;
use super::rule::{ObjectShape, Rule};
use super::Schema;
use crate::models::{IssuedTicket, SavedTicket, TicketCategory, TicketInput};

/// Largest count the ticket and event tables can hold.
pub(crate) const MAX_COUNT: f64 = i32::MAX as f64;

/// Largest price a `NUMERIC(12,2)` column can hold.
pub(crate) const MAX_PRICE: f64 = 9_999_999_999.99;

const PRICE_TOO_LARGE: &str = "Price must be at most 9999999999.99";

pub(crate) fn ticket_input_shape() -> ObjectShape {
    ObjectShape::new()
        .field("name", Rule::string().min_len(1, "Name is required"))
        .field("category", Rule::one_of(TicketCategory::ALL))
        .field("description", Rule::string().optional())
        .field(
            "price",
            Rule::number()
                .min(0.0, "Price must be positive")
                .max(MAX_PRICE, PRICE_TOO_LARGE),
        )
        .field(
            "limit",
            Rule::number()
                .int()
                .min(1.0, "Limit must be at least 1")
                .max(MAX_COUNT, "Limit must be at most 2147483647"),
        )
        .field(
            "ticketsPerPurchase",
            Rule::number()
                .int()
                .min(1.0, "Must allow at least 1 ticket per purchase")
                .max(MAX_COUNT, "Must allow at most 2147483647 tickets per purchase"),
        )
}

pub(crate) fn saved_ticket_shape() -> ObjectShape {
    ticket_input_shape()
        .field("id", Rule::string())
        .field(
            "price",
            Rule::number()
                .coerce()
                .min(0.0, "Price must be positive")
                .max(MAX_PRICE, PRICE_TOO_LARGE),
        )
}

pub(crate) fn issued_ticket_shape() -> ObjectShape {
    ObjectShape::new()
        .field("id", Rule::string())
        .field("eventId", Rule::string())
        .field("user", user_shape().into_rule().nullable())
        .field("checkedInDate", Rule::date().nullable())
        .field("createdAt", Rule::date())
        .field("updatedAt", Rule::date())
        .field("category", Rule::one_of(TicketCategory::ALL))
}

impl Schema for TicketInput {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| ticket_input_shape().into_rule())
    }
}

impl Schema for SavedTicket {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| saved_ticket_shape().into_rule())
    }
}

impl Schema for IssuedTicket {
    fn shape() -> &'static Rule {
        static SHAPE: OnceLock<Rule> = OnceLock::new();
        SHAPE.get_or_init(|| issued_ticket_shape().into_rule())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn vip() -> Value {
        json!({
            "name": "VIP pass",
            "category": "VIP",
            "price": 49.5,
            "limit": 100,
            "ticketsPerPurchase": 4
        })
    }

    #[test]
    fn test_valid_ticket() {
        let ticket = TicketInput::parse(&vip()).unwrap();

        assert_eq!(ticket.category, TicketCategory::Vip);
        assert_eq!(ticket.price, 49.5);
        assert_eq!(ticket.limit, 100);
        assert_eq!(ticket.description, None);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut input = vip();
        input["price"] = json!(-1);

        let errors = TicketInput::parse(&input).unwrap_err();
        assert_eq!(errors.field("price").unwrap().message, "Price must be positive");
    }

    #[test]
    fn test_free_ticket_is_allowed() {
        let mut input = vip();
        input["price"] = json!(0);

        assert_eq!(TicketInput::parse(&input).unwrap().price, 0.0);
    }

    #[test]
    fn test_reports_every_bad_field() {
        let errors = TicketInput::parse(&json!({
            "name": "",
            "category": "FRONT_ROW",
            "price": "10",
            "limit": 0,
            "ticketsPerPurchase": 0
        }))
        .unwrap_err();

        assert_eq!(errors.field("name").unwrap().message, "Name is required");
        assert!(errors.contains("category"));
        assert_eq!(
            errors.field("price").unwrap().message,
            "Expected number, received string"
        );
        assert_eq!(errors.field("limit").unwrap().message, "Limit must be at least 1");
        assert_eq!(
            errors.field("ticketsPerPurchase").unwrap().message,
            "Must allow at least 1 ticket per purchase"
        );
    }

    #[test]
    fn test_per_purchase_may_exceed_limit() {
        let mut input = vip();
        input["limit"] = json!(2);
        input["ticketsPerPurchase"] = json!(10);

        assert!(TicketInput::parse(&input).is_ok());
    }

    #[test]
    fn test_saved_ticket_coerces_text_price() {
        let mut input = vip();
        input["id"] = json!("t_1");
        input["price"] = json!("25.00");

        let ticket = SavedTicket::parse(&input).unwrap();
        assert_eq!(ticket.id, "t_1");
        assert_eq!(ticket.ticket.price, 25.0);
    }

    #[test]
    fn test_saved_ticket_requires_id() {
        let errors = SavedTicket::parse(&vip()).unwrap_err();
        assert_eq!(errors.field("id").unwrap().message, "Required");
    }

    #[test]
    fn test_saved_ticket_rejects_negative_text_price() {
        let mut input = vip();
        input["id"] = json!("t_1");
        input["price"] = json!("-5");

        assert!(SavedTicket::parse(&input).unwrap_err().contains("price"));
    }

    #[test]
    fn test_issued_ticket() {
        let ticket = IssuedTicket::parse(&json!({
            "id": "tk_1",
            "eventId": "ev_1",
            "user": null,
            "checkedInDate": null,
            "createdAt": "2025-05-01T10:00:00Z",
            "updatedAt": "2025-05-01T10:00:00Z",
            "category": "GENERAL"
        }))
        .unwrap();

        assert!(ticket.user.is_none());
        assert!(ticket.checked_in_date.is_none());
    }

    #[test]
    fn test_counts_beyond_storage_range_cite_the_field() {
        let mut input = vip();
        input["limit"] = json!(5_000_000_000u64);
        input["ticketsPerPurchase"] = json!(4_294_967_295u64);

        let errors = TicketInput::parse(&input).unwrap_err();
        assert_eq!(
            errors.field("limit").unwrap().message,
            "Limit must be at most 2147483647"
        );
        assert!(errors.contains("ticketsPerPurchase"));
        assert!(!errors.contains(""));

        input["limit"] = json!(2_147_483_647);
        input["ticketsPerPurchase"] = json!(2_147_483_647);
        assert_eq!(TicketInput::parse(&input).unwrap().limit, 2_147_483_647);
    }

    #[test]
    fn test_price_beyond_storage_range_is_rejected() {
        let mut input = vip();
        input["price"] = json!(1e12);
        assert_eq!(
            TicketInput::parse(&input).unwrap_err().field("price").unwrap().message,
            PRICE_TOO_LARGE
        );

        input["id"] = json!("t_1");
        input["price"] = json!("99999999999");
        assert!(SavedTicket::parse(&input).unwrap_err().contains("price"));
    }
}
