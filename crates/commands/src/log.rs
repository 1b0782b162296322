//! Execution logging middleware.

use std::time::Instant;

use async_trait::async_trait;

use crate::context::CommandContext;
use crate::middleware::{CommandMiddleware, Next, PipelineError};

/// Around-middleware that logs every command execution.
///
/// Emits a debug record on the way in and an info/error record with the
/// elapsed time on the way out. A chain that finishes successfully without
/// any result is logged as a warning - usually a sign that no middleware or
/// handler felt responsible for the command.
///
/// Register first so its post-logic runs last and observes the final result.
#[derive(Debug, Default)]
pub struct LogCommandMiddleware;

impl LogCommandMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<C, R> CommandMiddleware<C, R> for LogCommandMiddleware
where
    C: core::fmt::Debug + Send + 'static,
    R: Send + 'static,
{
    async fn handle(
        &self,
        ctx: &mut CommandContext<C, R>,
        next: Next<'_, C, R>,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        tracing::debug!(command = ?ctx.command(), "handling command");

        let outcome = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(()) if ctx.result().is_none() => {
                tracing::warn!(
                    command = ?ctx.command(),
                    elapsed_ms,
                    "command finished without a result"
                );
            }
            Ok(()) => {
                tracing::info!(elapsed_ms, "command handled");
            }
            Err(error) => {
                tracing::error!(command = ?ctx.command(), elapsed_ms, %error, "command failed");
            }
        }

        outcome
    }
}
