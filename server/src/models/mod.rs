pub mod custom_field;
pub mod event;
pub mod organization;
pub mod registration;
pub mod ticket;
pub mod user;

pub use custom_field::{CustomFieldDescriptor, CustomFieldType};
pub use event::{EventInput, EventType, NewEvent, OrganizationSummary, PublicEvent, SavedEvent};
pub use organization::Organization;
pub use registration::{Registration, RegistrationStatus, RegistrationSummary};
pub use ticket::{IssuedTicket, SavedTicket, TicketCategory, TicketInput};
pub use user::User;
