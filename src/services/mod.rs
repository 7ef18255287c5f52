pub mod event_service;
pub mod schedule_grid;
pub mod shift_admin_service;
pub mod shift_service;
pub mod ticket_limit;
pub mod ticket_service;
pub mod transfer_service;
pub mod user_service;

pub use event_service::*;
pub use schedule_grid::*;
pub use shift_admin_service::*;
pub use shift_service::*;
pub use ticket_limit::*;
pub use ticket_service::*;
pub use transfer_service::*;
pub use user_service::*;
