//! Per-command execution context.

use thiserror::Error;

/// Completion state of a [`CommandContext`].
///
/// Explicit two-state machine with a single legal transition
/// (`Pending → Completed`). Attempts to write after `Completed` are rejected,
/// never silently ignored: two writers after completion means two middleware
/// both believe they own the terminal decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The chain is still free to set or replace the result.
    Pending,
    /// A middleware (or the terminal handler) froze the result.
    Completed,
}

/// Context misuse error.
///
/// This is a programming error in middleware composition, not a
/// request-level failure. It must surface loudly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A write was attempted on an already-completed context.
    #[error("command context is already completed")]
    AlreadyCompleted,
}

/// Mutable carrier for one command's trip through the middleware chain.
///
/// Wraps exactly one command plus a result slot and a completion flag.
/// Created per incoming command, discarded once the caller has consumed the
/// result - the context itself is never persisted.
///
/// ## Result semantics
///
/// - `set_result` stores (or replaces) the result while the context is
///   pending. The terminal handler uses this for the baseline result, leaving
///   enclosing middleware free to rewrite it as the chain unwinds.
/// - `complete` stores the result **and** freezes the context. Any later
///   write fails with [`ContextError::AlreadyCompleted`].
///
/// ## Ownership
///
/// One context belongs to exactly one `execute` call and is mutated strictly
/// sequentially by the chain. It is `Send` (chain steps may hop worker
/// threads at await points) but never shared between concurrent executions.
#[derive(Debug)]
pub struct CommandContext<C, R> {
    command: C,
    result: Option<R>,
    completion: Completion,
}

impl<C, R> CommandContext<C, R> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            result: None,
            completion: Completion::Pending,
        }
    }

    /// The command being executed.
    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn is_completed(&self) -> bool {
        self.completion == Completion::Completed
    }

    /// Store (or replace) the result without freezing the context.
    ///
    /// Fails once the context is completed.
    pub fn set_result(&mut self, result: R) -> Result<(), ContextError> {
        if self.is_completed() {
            return Err(ContextError::AlreadyCompleted);
        }
        self.result = Some(result);
        Ok(())
    }

    /// Store the result and mark the context completed.
    ///
    /// Legal exactly once; a second call fails with
    /// [`ContextError::AlreadyCompleted`].
    pub fn complete(&mut self, result: R) -> Result<(), ContextError> {
        if self.is_completed() {
            return Err(ContextError::AlreadyCompleted);
        }
        self.result = Some(result);
        self.completion = Completion::Completed;
        Ok(())
    }

    /// The stored result, if any middleware or the terminal handler set one.
    ///
    /// An empty slot after a successful execution means the chain chose not
    /// to produce a result (e.g. an intentional short-circuit); a failed
    /// execution surfaces as an error instead, so the two are never conflated.
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    /// Consume the context, yielding the final result.
    pub fn into_result(self) -> Option<R> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_pending_and_empty() {
        let ctx: CommandContext<&str, u32> = CommandContext::new("cmd");
        assert_eq!(ctx.completion(), Completion::Pending);
        assert!(ctx.result().is_none());
        assert!(!ctx.is_completed());
    }

    #[test]
    fn set_result_is_overwritable_while_pending() {
        let mut ctx: CommandContext<&str, u32> = CommandContext::new("cmd");

        ctx.set_result(1).unwrap();
        ctx.set_result(2).unwrap();

        assert_eq!(ctx.result(), Some(&2));
        assert!(!ctx.is_completed());
    }

    #[test]
    fn complete_freezes_the_context() {
        let mut ctx: CommandContext<&str, u32> = CommandContext::new("cmd");

        ctx.complete(7).unwrap();

        assert!(ctx.is_completed());
        assert_eq!(ctx.set_result(8), Err(ContextError::AlreadyCompleted));
        assert_eq!(ctx.result(), Some(&7));
    }

    #[test]
    fn complete_twice_is_rejected() {
        let mut ctx: CommandContext<&str, u32> = CommandContext::new("cmd");

        ctx.complete(7).unwrap();
        let second = ctx.complete(9);

        assert_eq!(second, Err(ContextError::AlreadyCompleted));
        // The first result must survive the rejected write.
        assert_eq!(ctx.into_result(), Some(7));
    }

    #[test]
    fn complete_after_set_result_replaces_the_baseline() {
        let mut ctx: CommandContext<&str, u32> = CommandContext::new("cmd");

        ctx.set_result(1).unwrap();
        ctx.complete(2).unwrap();

        assert_eq!(ctx.result(), Some(&2));
        assert!(ctx.is_completed());
    }
}
