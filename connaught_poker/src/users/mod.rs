//! Users, their privacy flags, and the authenticated identity handed in by
//! the auth collaborator.
//!
//! Sessions and passwords live with the hosted auth service; this crate only
//! ever receives an [`AuthenticatedUser`] and records it in audit fields.

pub mod errors;
pub mod models;

pub use errors::{UserError, UserResult};
pub use models::{AuthenticatedUser, User, UserId, Visibility};
