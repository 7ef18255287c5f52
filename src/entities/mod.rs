pub mod events;
pub mod orders;
pub mod role_leads;
pub mod roles;
pub mod shift_assignments;
pub mod shifts;
pub mod ticket_types;
pub mod transfers;
pub mod users;

pub use events as event_entity;
pub use orders as order_entity;
pub use role_leads as role_lead_entity;
pub use roles as role_entity;
pub use shift_assignments as shift_assignment_entity;
pub use shifts as shift_entity;
pub use ticket_types as ticket_type_entity;
pub use transfers as transfer_entity;
pub use users as user_entity;

pub use orders::OrderStatus;
pub use transfers::TransferStatus;
