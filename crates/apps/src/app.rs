//! App aggregate (event-sourced).
//!
//! An app is the top-level container of the CMS: schemas, content and
//! clients hang off it, and people work on it as **contributors** with a
//! role each. This module models the contributor lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use quill_events::{Command, Event};

// ─────────────────────────────────────────────────────────────────────────────
// App ID
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for an app.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(Uuid);

impl AppId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AppId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AppId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AppId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<AppId> for Uuid {
    fn from(value: AppId) -> Self {
        value.0
    }
}

impl From<AggregateId> for AppId {
    fn from(value: AggregateId) -> Self {
        Self(*value.as_uuid())
    }
}

impl From<AppId> for AggregateId {
    fn from(value: AppId) -> Self {
        AggregateId::from_uuid(value.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Contributor Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Role a contributor holds within one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    /// Full control, including contributor management.
    Owner,
    /// Schema and client management.
    Developer,
    /// Content authoring.
    Editor,
    /// Read-only access.
    Reader,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Owner => "owner",
            AppRole::Developer => "developer",
            AppRole::Editor => "editor",
            AppRole::Reader => "reader",
        }
    }
}

impl core::fmt::Display for AppRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// App aggregate.
///
/// # Invariants
/// - An app is created exactly once; all other commands require it to exist.
/// - A contributor holds exactly one role (assigning again changes it).
/// - Re-assigning the role a contributor already holds is rejected.
/// - An app that has owners never loses its last one (neither by removal
///   nor by demotion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub id: AppId,
    pub name: String,
    /// Contributor id (user id or invited email) → role.
    pub contributors: BTreeMap<String, AppRole>,
    pub version: u64,
    pub created: bool,
}

impl App {
    pub fn empty(id: AppId) -> Self {
        Self {
            id,
            name: String::new(),
            contributors: BTreeMap::new(),
            version: 0,
            created: false,
        }
    }

    pub fn role_of(&self, contributor_id: &str) -> Option<AppRole> {
        self.contributors.get(contributor_id).copied()
    }

    fn owner_count(&self) -> usize {
        self.contributors
            .values()
            .filter(|r| **r == AppRole::Owner)
            .count()
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_not_last_owner(&self, contributor_id: &str) -> Result<(), DomainError> {
        if self.role_of(contributor_id) == Some(AppRole::Owner) && self.owner_count() == 1 {
            return Err(DomainError::invariant("app must retain at least one owner"));
        }
        Ok(())
    }
}

impl AggregateRoot for App {
    type Id = AppId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command to create a new app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApp {
    pub app_id: AppId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command to assign (or re-assign) a contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignContributor {
    pub app_id: AppId,
    /// Existing user id, or an email address when inviting.
    pub contributor_id: String,
    pub role: AppRole,
    /// Whether an unknown email address should be invited on the fly.
    pub is_inviting: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command to remove a contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveContributor {
    pub app_id: AppId,
    pub contributor_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// All app commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppCommand {
    Create(CreateApp),
    AssignContributor(AssignContributor),
    RemoveContributor(RemoveContributor),
}

impl Command for AppCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            AppCommand::Create(cmd) => cmd.app_id.into(),
            AppCommand::AssignContributor(cmd) => cmd.app_id.into(),
            AppCommand::RemoveContributor(cmd) => cmd.app_id.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Event emitted when an app is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCreated {
    pub app_id: AppId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event emitted when a contributor is assigned or changes role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorAssigned {
    pub app_id: AppId,
    pub contributor_id: String,
    pub role: AppRole,
    pub occurred_at: DateTime<Utc>,
}

/// Event emitted when a contributor is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRemoved {
    pub app_id: AppId,
    pub contributor_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// All app events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppEvent {
    Created(AppCreated),
    ContributorAssigned(ContributorAssigned),
    ContributorRemoved(ContributorRemoved),
}

impl Event for AppEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AppEvent::Created(_) => "app.created",
            AppEvent::ContributorAssigned(_) => "app.contributor_assigned",
            AppEvent::ContributorRemoved(_) => "app.contributor_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AppEvent::Created(e) => e.occurred_at,
            AppEvent::ContributorAssigned(e) => e.occurred_at,
            AppEvent::ContributorRemoved(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for App {
    type Command = AppCommand;
    type Event = AppEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AppEvent::Created(e) => self.apply_created(e),
            AppEvent::ContributorAssigned(e) => self.apply_contributor_assigned(e),
            AppEvent::ContributorRemoved(e) => self.apply_contributor_removed(e),
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AppCommand::Create(cmd) => self.handle_create(cmd),
            AppCommand::AssignContributor(cmd) => self.handle_assign_contributor(cmd),
            AppCommand::RemoveContributor(cmd) => self.handle_remove_contributor(cmd),
        }
    }
}

impl App {
    // ─────────────────────────────────────────────────────────────────────────
    // Command Handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_create(&self, cmd: &CreateApp) -> Result<Vec<AppEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("app already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("app name cannot be empty"));
        }

        Ok(vec![AppEvent::Created(AppCreated {
            app_id: cmd.app_id,
            name: cmd.name.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_contributor(
        &self,
        cmd: &AssignContributor,
    ) -> Result<Vec<AppEvent>, DomainError> {
        self.ensure_created()?;

        if cmd.contributor_id.trim().is_empty() {
            return Err(DomainError::validation("contributor id cannot be empty"));
        }

        if self.role_of(&cmd.contributor_id) == Some(cmd.role) {
            return Err(DomainError::invariant("contributor already has this role"));
        }

        // A role change away from owner counts as losing an owner.
        if cmd.role != AppRole::Owner {
            self.ensure_not_last_owner(&cmd.contributor_id)?;
        }

        Ok(vec![AppEvent::ContributorAssigned(ContributorAssigned {
            app_id: cmd.app_id,
            contributor_id: cmd.contributor_id.clone(),
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_contributor(
        &self,
        cmd: &RemoveContributor,
    ) -> Result<Vec<AppEvent>, DomainError> {
        self.ensure_created()?;

        if self.role_of(&cmd.contributor_id).is_none() {
            return Err(DomainError::NotFound);
        }

        self.ensure_not_last_owner(&cmd.contributor_id)?;

        Ok(vec![AppEvent::ContributorRemoved(ContributorRemoved {
            app_id: cmd.app_id,
            contributor_id: cmd.contributor_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Appliers
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_created(&mut self, e: &AppCreated) {
        self.id = e.app_id;
        self.name = e.name.clone();
        self.created = true;
    }

    fn apply_contributor_assigned(&mut self, e: &ContributorAssigned) {
        self.contributors.insert(e.contributor_id.clone(), e.role);
    }

    fn apply_contributor_removed(&mut self, e: &ContributorRemoved) {
        self.contributors.remove(&e.contributor_id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
