//! `quill-apps` — the app aggregate and its command pipeline pieces.
//!
//! Apps are the CMS's top-level containers. This crate models their
//! event-sourced lifecycle (creation, contributor management), the outcome
//! shapes app commands produce, and the invite-on-assign middleware that
//! enriches email-based contributor assignments.

pub mod app;
pub mod invite;
pub mod outcome;

pub use app::{
    App, AppCommand, AppCreated, AppEvent, AppId, AppRole, AssignContributor, ContributorAssigned,
    ContributorRemoved, CreateApp, RemoveContributor,
};
pub use invite::InviteUserMiddleware;
pub use outcome::CommandOutcome;
