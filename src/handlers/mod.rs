pub mod admin;
pub mod event;
pub mod shift;
pub mod ticket;
pub mod transfer;

pub use admin::admin_config;
pub use event::event_config;
pub use shift::shift_config;
pub use ticket::ticket_config;
pub use transfer::transfer_config;
