//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_core::UserId;

/// A user account known to the system.
///
/// Accounts come into being either explicitly or on demand, when a
/// contributor is invited by email before ever signing in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    /// Normalized (trimmed, lowercased) email address.
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Build a fresh account for a normalized email.
    ///
    /// The display name defaults to the local part of the address until the
    /// user picks one.
    pub fn provisional(id: UserId, email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let email = email.into();
        let display_name = email
            .split('@')
            .next()
            .unwrap_or(email.as_str())
            .to_string();

        Self {
            id,
            email,
            display_name,
            created_at,
        }
    }
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Syntactic email check.
///
/// Distinguishes "this contributor id is an address" from "this is an
/// existing user id". Deliverability is not checked - only shape.
pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_plain_addresses() {
        assert!(is_email("user@example.com"));
        assert!(is_email("first.last@sub.example.org"));
        assert!(is_email("  padded@example.com  "));
    }

    #[test]
    fn rejects_user_ids_and_malformed_addresses() {
        assert!(!is_email("user-123"));
        assert!(!is_email("0198c5a6-7b8a-7000-8000-000000000000"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("user@"));
        assert!(!is_email("user@nodot"));
        assert!(!is_email("user@exam ple.com"));
        assert!(!is_email("user@@example.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn provisional_account_derives_display_name() {
        let account = UserAccount::provisional(UserId::new(), "alice@example.com", Utc::now());
        assert_eq!(account.display_name, "alice");
    }
}
