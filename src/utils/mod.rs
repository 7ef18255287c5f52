pub mod email;
pub mod jwt;

pub use email::*;
pub use jwt::*;
