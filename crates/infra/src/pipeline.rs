//! Process-level command pipeline assembly.
//!
//! The chain order is part of the deployed configuration: logging wraps
//! everything, invitation handling wraps persistence. Registered once at
//! startup; callers share the pipeline behind an `Arc`.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use quill_apps::{AppCommand, CommandOutcome, InviteUserMiddleware};
use quill_commands::{CommandPipeline, LogCommandMiddleware};
use quill_events::{EventBus, EventEnvelope};
use quill_users::UserResolver;

use crate::command_dispatcher::AppCommandHandler;
use crate::event_store::EventStore;

/// Build the default app command pipeline:
/// `log → invite-on-assign → aggregate persistence`.
pub fn app_command_pipeline<S, B, U>(
    store: S,
    bus: B,
    users: U,
) -> CommandPipeline<AppCommand, CommandOutcome>
where
    S: EventStore + 'static,
    B: EventBus<EventEnvelope<JsonValue>> + 'static,
    U: UserResolver + 'static,
{
    CommandPipeline::new(Arc::new(AppCommandHandler::new(store, bus)))
        .with(Arc::new(LogCommandMiddleware::new()))
        .with(Arc::new(InviteUserMiddleware::new(users)))
}
