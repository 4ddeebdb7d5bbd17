//! The record store: one durable collection of user records.
//!
//! The whole collection lives in memory behind a single mutex and is
//! rewritten to a JSON file after every mutation. Mutations hold the lock
//! across the entire read-check-mutate-persist sequence, so two racing
//! inserts can never both pass the uniqueness check. Reads lock briefly
//! and return clones; no caller ever holds a reference into the store.
//!
//! Persistence is persist-then-commit: the mutation is applied to a
//! working copy, written to a temp file and renamed over the store file,
//! and only then committed to memory. A failed write leaves the in-memory
//! collection unchanged and surfaces as `StorageUnavailable`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::store::record::{NewUser, UserPatch, UserRecord};
use crate::types::{Account, UserId};

/// On-disk shape of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// Mutex-guarded user collection persisted to a JSON file.
pub struct UserStore {
    path: PathBuf,
    records: Mutex<Vec<UserRecord>>,
}

impl UserStore {
    /// Open the store, loading the collection from `path`.
    ///
    /// A missing file is an empty collection; a present but unparsable
    /// file is a startup error rather than silent data loss.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let file: StoreFile = serde_json::from_slice(&raw)
                    .map_err(|e| anyhow::anyhow!("store file {} is corrupt: {}", path.display(), e))?;
                file.users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("store file {} not found, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "cannot read store file {}: {}",
                    path.display(),
                    e
                ));
            }
        };

        info!("loaded {} user record(s) from {}", records.len(), path.display());

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Create an empty store file at `path` if none exists.
    pub async fn init_file(path: impl AsRef<Path>) -> anyhow::Result<bool> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            return Ok(false);
        }
        let body = serde_json::to_vec_pretty(&StoreFile::default())?;
        tokio::fs::write(path, body).await?;
        Ok(true)
    }

    /// Write the given collection to disk. Called with the record lock
    /// held; the in-memory collection is only replaced after this
    /// succeeds.
    async fn persist(&self, records: &[UserRecord]) -> ApiResult<()> {
        let file = StoreFile {
            users: records.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&file)
            .map_err(|e| ApiError::StorageUnavailable(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| ApiError::StorageUnavailable(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            // Don't leave the orphaned temp file behind.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ApiError::StorageUnavailable(e.to_string()));
        }

        debug!("persisted {} record(s) to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Every record currently held. Never fails; an empty collection is
    /// an empty vector.
    pub async fn all(&self) -> Vec<UserRecord> {
        self.records.lock().await.clone()
    }

    /// Look up a record by id.
    pub async fn find_by_id(&self, id: &UserId) -> ApiResult<UserRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.id == *id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    /// Look up a record by account name.
    pub async fn find_by_account(&self, account: &Account) -> ApiResult<UserRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.account == *account)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    /// Look up a record by exact account and password-hash equality.
    ///
    /// Returns `AuthenticationFailed` on no match, without distinguishing
    /// an unknown account from a wrong password.
    pub async fn find_by_credentials(
        &self,
        account: &Account,
        password_hash: &str,
    ) -> ApiResult<UserRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.account == *account && r.password == password_hash)
            .cloned()
            .ok_or(ApiError::AuthenticationFailed)
    }

    /// Insert a new record, enforcing account and mail uniqueness.
    ///
    /// The account check takes precedence when both collide. On success
    /// the freshly generated id is returned.
    pub async fn insert(&self, new: NewUser) -> ApiResult<UserId> {
        let mut records = self.records.lock().await;

        if records.iter().any(|r| r.account == new.account) {
            return Err(ApiError::DuplicateAccount);
        }
        if records.iter().any(|r| r.mail == new.mail) {
            return Err(ApiError::DuplicateMail);
        }

        let id = UserId::new(Uuid::new_v4().to_string());
        let record = UserRecord {
            id: id.clone(),
            account: new.account,
            password: new.password,
            name: new.name,
            mail: new.mail,
            head: new.head,
        };

        let mut next = records.clone();
        next.push(record);
        self.persist(&next).await?;
        *records = next;

        info!("inserted user record {}", id);
        Ok(id)
    }

    /// Overwrite the mutable fields of a record.
    ///
    /// Full overwrite, not a merge: `password`, `name` and `head` all take
    /// the values in `patch`. `id`, `account` and `mail` are untouched.
    pub async fn update(&self, id: &UserId, patch: UserPatch) -> ApiResult<UserRecord> {
        let mut records = self.records.lock().await;

        let pos = records
            .iter()
            .position(|r| r.id == *id)
            .ok_or(ApiError::NotFound)?;

        let mut next = records.clone();
        let record = &mut next[pos];
        record.password = patch.password;
        record.name = patch.name;
        record.head = patch.head;
        let updated = record.clone();

        self.persist(&next).await?;
        *records = next;

        info!("updated user record {}", id);
        Ok(updated)
    }

    /// Remove a record, returning it.
    pub async fn remove(&self, id: &UserId) -> ApiResult<UserRecord> {
        let mut records = self.records.lock().await;

        let pos = records
            .iter()
            .position(|r| r.id == *id)
            .ok_or(ApiError::NotFound)?;

        let mut next = records.clone();
        let removed = next.remove(pos);

        self.persist(&next).await?;
        *records = next;

        info!("removed user record {}", id);
        Ok(removed)
    }
}
