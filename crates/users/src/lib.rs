//! `quill-users` — user accounts and on-demand resolution.
//!
//! The [`UserResolver`] is the collaborator the invite middleware leans on:
//! "create a user for this email if one does not already exist", reporting
//! whether creation actually occurred.

pub mod resolver;
pub mod user;

pub use resolver::{InMemoryUserResolver, UserResolver, UserResolverError};
pub use user::{UserAccount, is_email, normalize_email};
