//! `quill-commands` — command middleware pipeline.
//!
//! Chain-of-responsibility mechanics for domain commands: a per-command
//! [`CommandContext`], the [`CommandMiddleware`] / [`CommandHandler`]
//! contracts with their [`Next`] continuation, and the [`CommandPipeline`]
//! executor that composes a configured chain into a single entry point.
//!
//! Middleware run strictly sequentially per execution, may act before and
//! after delegating to the remainder of the chain, and may short-circuit by
//! not delegating at all. The terminal handler applies the command to its
//! aggregate and records the baseline result; unwinding middleware may
//! enrich or replace it.

pub mod context;
pub mod log;
pub mod middleware;
pub mod pipeline;

pub use context::{CommandContext, Completion, ContextError};
pub use log::LogCommandMiddleware;
pub use middleware::{CommandHandler, CommandMiddleware, Next, PipelineError};
pub use pipeline::CommandPipeline;
