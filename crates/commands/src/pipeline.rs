//! Command pipeline executor (chain composition).
//!
//! This module turns an ordered list of middleware plus one terminal handler
//! into a single entry point. The chain is fixed at process configuration
//! time and never mutated per request; each execution walks it with a
//! borrowed slice cursor ([`Next`]).
//!
//! ## Execution Guarantees
//!
//! - Middleware pre-logic runs in registration order; post-logic unwinds in
//!   reverse order as each `next.run(..).await` returns.
//! - A middleware that does not delegate short-circuits every later
//!   middleware and the terminal handler.
//! - The terminal handler runs exactly once per execution unless
//!   short-circuited ([`Next`] is consumed by value).
//! - Failures propagate untouched through every enclosing middleware; the
//!   pipeline performs no retry and no suppression.
//!
//! ## Cancellation
//!
//! Execution is strictly sequential on the caller's task. Dropping the
//! `execute` future cancels the chain at its current await point; result
//! writes only ever happen between awaits, so no write can occur after
//! cancellation.

use std::sync::Arc;

use crate::context::CommandContext;
use crate::middleware::{CommandHandler, CommandMiddleware, Next, PipelineError};

/// Ordered middleware chain plus terminal handler.
///
/// Configure once at startup (registration order is part of the deployed
/// configuration), then share behind an `Arc` and call
/// [`execute`](CommandPipeline::execute) per incoming command. Distinct
/// executions interleave freely; the pipeline provides no global
/// serialization.
pub struct CommandPipeline<C, R> {
    chain: Vec<Arc<dyn CommandMiddleware<C, R>>>,
    handler: Arc<dyn CommandHandler<C, R>>,
}

impl<C, R> CommandPipeline<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    /// A pipeline with an empty chain: every command goes straight to the
    /// terminal handler.
    pub fn new(handler: Arc<dyn CommandHandler<C, R>>) -> Self {
        Self {
            chain: Vec::new(),
            handler,
        }
    }

    /// Append a middleware to the end of the chain (runs after everything
    /// registered before it on the way in, before them on the way out).
    pub fn with(mut self, middleware: Arc<dyn CommandMiddleware<C, R>>) -> Self {
        self.chain.push(middleware);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.chain.len()
    }

    /// Drive one context through the full chain.
    ///
    /// Returns once all middleware post-logic has finished. On `Ok`, the
    /// caller reads the final result from the context; an empty result slot
    /// then means the chain deliberately produced none.
    pub async fn execute(&self, ctx: &mut CommandContext<C, R>) -> Result<(), PipelineError> {
        Next::new(&self.chain, &*self.handler).run(ctx).await
    }

    /// Convenience entry point: wrap the command in a fresh context, execute,
    /// and hand the finished context back.
    pub async fn publish(&self, command: C) -> Result<CommandContext<C, R>, PipelineError> {
        let mut ctx = CommandContext::new(command);
        self.execute(&mut ctx).await?;
        Ok(ctx)
    }
}
