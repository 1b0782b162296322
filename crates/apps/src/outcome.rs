//! Result shapes produced by app command executions.

use serde::{Deserialize, Serialize};

/// Outcome of one command, as recorded on the command context.
///
/// A closed set: middleware that observe or rewrite outcomes match on it
/// exhaustively instead of probing open-ended types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// An entity came into being; `id` names it (an app id for `Create`,
    /// a contributor id for `AssignContributor`).
    Created { id: String, version: u64 },

    /// Enrichment of [`CommandOutcome::Created`]: the contributor's user
    /// account was provisioned as part of this command.
    Invited { id: String, version: u64 },

    /// State changed without creating anything.
    Committed { version: u64 },
}

impl CommandOutcome {
    /// Stream version after the command was applied.
    pub fn version(&self) -> u64 {
        match self {
            CommandOutcome::Created { version, .. } => *version,
            CommandOutcome::Invited { version, .. } => *version,
            CommandOutcome::Committed { version } => *version,
        }
    }
}
