//! Data models

mod campaign;
mod context;
mod user;

pub use campaign::*;
pub use context::*;
pub use user::*;
