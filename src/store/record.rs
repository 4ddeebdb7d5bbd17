//! Record models for the user store.

use crate::types::{Account, UserId};
use serde::{Deserialize, Serialize};

/// A user record as held by the store and persisted to disk.
///
/// `id`, `account` and `mail` are immutable after creation; `password`,
/// `name` and `head` may be overwritten by an update. The `password`
/// field holds the SHA-256 hex digest of the password, never the
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub account: Account,
    pub password: String,
    pub name: String,
    pub mail: String,
    /// Avatar reference, optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

/// The externally visible view of a record: everything except the
/// password. This is what list/lookup responses and token claims carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub account: Account,
    pub name: String,
    pub mail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            account: record.account.clone(),
            name: record.name.clone(),
            mail: record.mail.clone(),
            head: record.head.clone(),
        }
    }
}

/// Fields for creating a record. The store generates the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub account: Account,
    /// SHA-256 hex digest, hashed by the caller before reaching the store.
    pub password: String,
    pub name: String,
    pub mail: String,
    pub head: Option<String>,
}

/// Mutable fields of a record.
///
/// Updates are a full overwrite of these three fields, not a merge: an
/// omitted `head` clears the stored avatar. This mirrors the documented
/// API contract.
#[derive(Debug, Clone)]
pub struct UserPatch {
    /// SHA-256 hex digest of the new password.
    pub password: String,
    pub name: String,
    pub head: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> UserRecord {
        UserRecord {
            id: UserId::new("id-1"),
            account: Account::new("alice"),
            password: "0123abcd".to_string(),
            name: "Alice".to_string(),
            mail: "alice@example.com".to_string(),
            head: Some("avatar.png".to_string()),
        }
    }

    #[test]
    fn test_public_user_strips_password() {
        let record = sample_record();
        let public = PublicUser::from(&record);

        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["id"], "id-1");
        assert_eq!(json["account"], "alice");
        assert_eq!(json["head"], "avatar.png");
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: UserRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_missing_head_deserializes_as_none() {
        let json = r#"{
            "id": "id-2",
            "account": "bob",
            "password": "feed",
            "name": "Bob",
            "mail": "bob@example.com"
        }"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.head, None);
    }
}
