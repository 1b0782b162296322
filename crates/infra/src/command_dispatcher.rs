//! Command execution terminal (application-level orchestration).
//!
//! This module implements the persistence end of the command pipeline. When
//! a command has traveled the whole middleware chain, it lands here: the
//! aggregate's history is loaded, state is rehydrated, the command is
//! decided, and the resulting events are appended and published.
//!
//! ```text
//! Command (via pipeline)
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus (for projections, handlers, etc.)
//! ```
//!
//! The dispatcher composes the `EventStore` and `EventBus` traits, so it is
//! testable with in-memory implementations and swappable with real backends.
//! It contains no IO itself.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use async_trait::async_trait;

use quill_apps::{App, AppCommand, AppId, CommandOutcome};
use quill_commands::{CommandContext, CommandHandler, PipelineError};
use quill_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use quill_events::{Command, EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale aggregate version).
    Concurrency(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain-level not found.
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

impl From<DispatchError> for PipelineError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) => DomainError::Validation(msg).into(),
            DispatchError::InvariantViolation(msg) => DomainError::InvariantViolation(msg).into(),
            DispatchError::Concurrency(msg) => DomainError::Conflict(msg).into(),
            DispatchError::NotFound => DomainError::NotFound.into(),
            DispatchError::Deserialize(msg) => {
                PipelineError::infrastructure(format!("event deserialization failed: {msg}"))
            }
            DispatchError::Store(e) => PipelineError::infrastructure(e.to_string()),
            DispatchError::Publish(msg) => {
                PipelineError::infrastructure(format!("event publication failed: {msg}"))
            }
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// ## Execution Guarantees
///
/// - **Atomicity**: Events are persisted before publication (if append fails,
///   nothing is published)
/// - **Isolation**: Each command operates on a single aggregate instance
/// - **Concurrency**: Optimistic version checking; a concurrent writer makes
///   the append fail with `DispatchError::Concurrency`
///
/// ## At-Least-Once Delivery
///
/// If event publication fails after a successful append, the error is
/// returned to the caller. The events are already persisted, so retrying
/// publication is safe.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full event-sourcing sequence.
    ///
    /// 1. **Load**: Retrieve all events for the aggregate from the store
    /// 2. **Validate**: Check stream scoping and event ordering (defense in depth)
    /// 3. **Rehydrate**: Apply historical events to rebuild current state
    /// 4. **Decide**: Call `aggregate.handle(command)` (pure, no mutation)
    /// 5. **Persist**: Append with an optimistic concurrency check
    /// 6. **Publish**: Publish committed events for downstream consumers
    ///
    /// The `make_aggregate` closure lets the dispatcher work with any
    /// aggregate type without knowing how to construct it.
    ///
    /// Returns the committed `StoredEvent`s (with assigned sequence numbers)
    /// if successful; callers derive the new stream version from them.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: quill_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish committed events (after append)
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Enforce stream scoping even if a buggy backend returns foreign data.
    // Also ensure the stream is monotonically increasing by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!("loaded stream contains wrong aggregate_id at index {idx}"),
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

/// Aggregate type identifier for app streams.
pub const APP_AGGREGATE_TYPE: &str = "app";

/// Terminal handler for app commands.
///
/// Sits at the end of the middleware chain: applies the command to the app
/// aggregate via [`CommandDispatcher`] and records the baseline
/// [`CommandOutcome`] on the context. It uses `set_result`, not `complete`,
/// so enclosing middleware stay free to enrich the outcome as the chain
/// unwinds (the invite middleware depends on this).
pub struct AppCommandHandler<S, B> {
    dispatcher: CommandDispatcher<S, B>,
}

impl<S, B> AppCommandHandler<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
        }
    }
}

#[async_trait]
impl<S, B> CommandHandler<AppCommand, CommandOutcome> for AppCommandHandler<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    async fn handle(
        &self,
        ctx: &mut CommandContext<AppCommand, CommandOutcome>,
    ) -> Result<(), PipelineError> {
        let command = ctx.command().clone();
        let aggregate_id = command.target_aggregate_id();

        let committed = self
            .dispatcher
            .dispatch(aggregate_id, APP_AGGREGATE_TYPE, command.clone(), |id| {
                App::empty(AppId::from(id))
            })
            .map_err(PipelineError::from)?;

        let version = committed
            .last()
            .map(|e| e.sequence_number)
            .unwrap_or_default();

        let outcome = match &command {
            AppCommand::Create(cmd) => CommandOutcome::Created {
                id: cmd.app_id.to_string(),
                version,
            },
            // The created "entity" is the contributor entry; its id is what
            // downstream middleware key on.
            AppCommand::AssignContributor(cmd) => CommandOutcome::Created {
                id: cmd.contributor_id.clone(),
                version,
            },
            AppCommand::RemoveContributor(_) => CommandOutcome::Committed { version },
        };

        ctx.set_result(outcome)?;

        Ok(())
    }
}
