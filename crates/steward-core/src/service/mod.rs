//! User services built on the repository

mod identity;
mod user;

pub use identity::{IdentityVerifier, StaticIdentityVerifier};
pub use user::{DefaultUserService, UserService};
