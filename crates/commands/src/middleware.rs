//! Middleware and terminal-handler contracts.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use quill_core::DomainError;

use crate::context::{CommandContext, ContextError};

/// Failure raised while a command travels the chain.
///
/// The pipeline is a pure pass-through for faults: nothing in the chain is
/// obligated to catch anything, and no retry or suppression happens
/// implicitly. Middleware that intercept a failure for compensating action
/// decide themselves whether to rethrow, substitute a result, or suppress.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Deterministic business/validation failure from the domain layer.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Context misuse (e.g. completing an already-completed context).
    #[error("command context misuse: {0}")]
    Context(#[from] ContextError),

    /// Storage, publication or external-collaborator failure.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl PipelineError {
    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }
}

/// A unit of logic in the command chain.
///
/// Each middleware receives the context plus a [`Next`] continuation bound to
/// the remainder of the chain. It may:
///
/// - run logic before delegating (`next.run(ctx).await`),
/// - run logic after the inner chain returns (post-logic unwinds in reverse
///   registration order),
/// - or not delegate at all, short-circuiting everything downstream.
///
/// `Next` is consumed by value, so a middleware can delegate **at most
/// once** - the single-terminal-invocation guarantee is enforced by the type
/// system rather than by convention.
#[async_trait]
pub trait CommandMiddleware<C, R>: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut CommandContext<C, R>,
        next: Next<'_, C, R>,
    ) -> Result<(), PipelineError>;
}

/// Terminal step of the chain: apply the command to its target aggregate and
/// record the baseline result on the context.
///
/// Implementations should use `set_result` (not `complete`) so that
/// middleware post-logic remains free to rewrite the outcome as the call
/// stack unwinds.
#[async_trait]
pub trait CommandHandler<C, R>: Send + Sync {
    async fn handle(&self, ctx: &mut CommandContext<C, R>) -> Result<(), PipelineError>;
}

/// Continuation over the remainder of the chain.
///
/// A fresh `Next` is constructed per invocation as a slice cursor over the
/// configured chain - no linked middleware nodes, no per-request allocation
/// of the chain itself.
pub struct Next<'a, C, R> {
    chain: &'a [Arc<dyn CommandMiddleware<C, R>>],
    handler: &'a dyn CommandHandler<C, R>,
}

impl<'a, C, R> Next<'a, C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        chain: &'a [Arc<dyn CommandMiddleware<C, R>>],
        handler: &'a dyn CommandHandler<C, R>,
    ) -> Self {
        Self { chain, handler }
    }

    /// Invoke the rest of the chain, ending in the terminal handler.
    ///
    /// Consumes the continuation: delegating twice is unrepresentable.
    pub async fn run(self, ctx: &mut CommandContext<C, R>) -> Result<(), PipelineError> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    chain: rest,
                    handler: self.handler,
                };
                head.handle(ctx, next).await
            }
            None => self.handler.handle(ctx).await,
        }
    }
}
