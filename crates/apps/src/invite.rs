//! Invite-on-assign middleware.

use async_trait::async_trait;

use quill_commands::{CommandContext, CommandMiddleware, Next, PipelineError};
use quill_users::{UserResolver, is_email};

use crate::app::AppCommand;
use crate::outcome::CommandOutcome;

/// Upgrades "contributor assigned" into "user invited" for email-based
/// assignments.
///
/// Applies only to [`AppCommand::AssignContributor`] flagged as inviting
/// whose contributor id is syntactically an email address; every other
/// command passes through untouched.
///
/// When it applies, the account is provisioned through the
/// [`UserResolver`] *before* delegating, the rest of the chain (including
/// the terminal persistence step) runs to completion, and only then - iff
/// the account was newly created and the inner chain produced a
/// [`CommandOutcome::Created`] - is the result finalized as
/// [`CommandOutcome::Invited`] with the same id. The terminal persistence
/// logic needs no awareness of invitation semantics.
pub struct InviteUserMiddleware<U> {
    users: U,
}

impl<U> InviteUserMiddleware<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }
}

#[async_trait]
impl<U> CommandMiddleware<AppCommand, CommandOutcome> for InviteUserMiddleware<U>
where
    U: UserResolver + 'static,
{
    async fn handle(
        &self,
        ctx: &mut CommandContext<AppCommand, CommandOutcome>,
        next: Next<'_, AppCommand, CommandOutcome>,
    ) -> Result<(), PipelineError> {
        let email = match ctx.command() {
            AppCommand::AssignContributor(cmd)
                if cmd.is_inviting && is_email(&cmd.contributor_id) =>
            {
                cmd.contributor_id.clone()
            }
            _ => return next.run(ctx).await,
        };

        let newly_created = self
            .users
            .create_user_if_not_exists(&email)
            .await
            .map_err(|e| PipelineError::infrastructure(e.to_string()))?;

        next.run(ctx).await?;

        if newly_created {
            if let Some(CommandOutcome::Created { id, version }) = ctx.result() {
                let (id, version) = (id.clone(), *version);
                tracing::info!(%email, contributor_id = %id, "contributor invited");
                ctx.complete(CommandOutcome::Invited { id, version })?;
            }
        }

        Ok(())
    }
}
