pub mod admin;
pub mod common;
pub mod event;
pub mod pagination;
pub mod shift;
pub mod ticket;
pub mod transfer;

pub use admin::*;
pub use common::*;
pub use event::*;
pub use pagination::*;
pub use shift::*;
pub use ticket::*;
pub use transfer::*;
