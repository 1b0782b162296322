//! User resolution (create-on-demand collaborator).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use quill_core::UserId;

use crate::user::{UserAccount, is_email, normalize_email};

/// User resolution error.
#[derive(Debug, Error)]
pub enum UserResolverError {
    /// The supplied identifier is not a syntactically valid email address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The backing account storage failed.
    #[error("user storage failure: {0}")]
    Storage(String),
}

/// Resolves email addresses to user accounts, creating accounts on demand.
///
/// Implementations must be safe under concurrent calls for the same email:
/// at most one account per normalized address, ever. The caller cannot
/// distinguish "created by me" from "created by a racing call" except
/// through the returned flag.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Create an account for `email` if none exists yet.
    ///
    /// Returns `true` when a new account was just created, `false` when one
    /// already existed.
    async fn create_user_if_not_exists(&self, email: &str) -> Result<bool, UserResolverError>;

    /// Look up an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserResolverError>;
}

#[async_trait]
impl<U> UserResolver for Arc<U>
where
    U: UserResolver + ?Sized,
{
    async fn create_user_if_not_exists(&self, email: &str) -> Result<bool, UserResolverError> {
        (**self).create_user_if_not_exists(email).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserResolverError> {
        (**self).find_by_email(email).await
    }
}

/// In-memory account store.
///
/// Intended for tests/dev. A single map lock makes the create-if-absent
/// check-and-insert atomic, which is all the concurrency guarantee the
/// trait demands.
#[derive(Debug, Default)]
pub struct InMemoryUserResolver {
    accounts: Mutex<HashMap<String, UserAccount>>,
}

impl InMemoryUserResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an account (e.g. an already-registered user in tests).
    pub fn seed(&self, email: &str) -> Result<UserAccount, UserResolverError> {
        let email = validated(email)?;
        let account = UserAccount::provisional(UserId::new(), email.clone(), Utc::now());

        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserResolverError::Storage("lock poisoned".to_string()))?;
        accounts.insert(email, account.clone());

        Ok(account)
    }
}

fn validated(raw: &str) -> Result<String, UserResolverError> {
    if !is_email(raw) {
        return Err(UserResolverError::InvalidEmail(raw.to_string()));
    }
    Ok(normalize_email(raw))
}

#[async_trait]
impl UserResolver for InMemoryUserResolver {
    async fn create_user_if_not_exists(&self, email: &str) -> Result<bool, UserResolverError> {
        let email = validated(email)?;

        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserResolverError::Storage("lock poisoned".to_string()))?;

        if accounts.contains_key(&email) {
            return Ok(false);
        }

        let account = UserAccount::provisional(UserId::new(), email.clone(), Utc::now());
        tracing::info!(email = %account.email, user_id = %account.id, "provisioned user account");
        accounts.insert(email, account);

        Ok(true)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserResolverError> {
        let email = validated(email)?;

        let accounts = self
            .accounts
            .lock()
            .map_err(|_| UserResolverError::Storage("lock poisoned".to_string()))?;

        Ok(accounts.get(&email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_creates_later_calls_do_not() {
        let resolver = InMemoryUserResolver::new();

        assert!(resolver.create_user_if_not_exists("new@example.com").await.unwrap());
        assert!(!resolver.create_user_if_not_exists("new@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn lookup_is_normalized() {
        let resolver = InMemoryUserResolver::new();
        resolver.create_user_if_not_exists(" Mixed@Example.COM ").await.unwrap();

        let found = resolver.find_by_email("mixed@example.com").await.unwrap();
        assert!(found.is_some());

        // The normalized form counts as existing for later creates too.
        assert!(!resolver.create_user_if_not_exists("MIXED@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_non_email_identifiers() {
        let resolver = InMemoryUserResolver::new();

        let result = resolver.create_user_if_not_exists("user-123").await;
        assert!(matches!(result, Err(UserResolverError::InvalidEmail(_))));
    }

    #[tokio::test]
    async fn seeded_accounts_already_exist() {
        let resolver = InMemoryUserResolver::new();
        resolver.seed("existing@example.com").unwrap();

        assert!(!resolver.create_user_if_not_exists("existing@example.com").await.unwrap());
    }
}
