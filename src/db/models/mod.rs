//! Database models split into domain-specific modules.

pub mod invite;
pub mod notification;
pub mod ride;
pub mod user;

pub use invite::*;
pub use notification::*;
pub use ride::*;
pub use user::*;
