//! `quill-events` — event and command mechanics.
//!
//! Domain-agnostic contracts for event-sourced modules: the `Command` and
//! `Event` traits, the stream envelope, and the pub/sub bus used to fan
//! committed events out to consumers.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
