//! On-disk mail store
//!
//! Flat-file layout under one data root: a subdirectory per canonical
//! username holding a `credential` file and zero or more message
//! files, plus a shared `dead-letter` subdirectory for undeliverable
//! mail. The [`Storage`] trait is the capability set the rest of the
//! crate is written against, so the flat-file backend could be swapped
//! for an embedded key-value store without touching the dispatcher.

#![allow(clippy::missing_errors_doc, clippy::future_not_send)]

use crate::error::Result;
use crate::proto::Email;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Name of the password-verifier record inside an account directory.
pub const CREDENTIAL_FILE: &str = "credential";

/// Shared area for undeliverable messages. Write-only from the
/// client's perspective; nothing ever reads it back.
pub const DEAD_LETTER_DIR: &str = "dead-letter";

/// Capability set of a mail store.
///
/// Usernames passed in are already canonical; message names are only
/// ever values previously returned by [`Storage::list_messages`].
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Create an account exclusively: if an account with this name
    /// exists, fails with an `AlreadyExists` I/O error and changes
    /// nothing.
    async fn create_account(&self, username: &str, verifier: &str) -> Result<()>;

    async fn account_exists(&self, username: &str) -> Result<bool>;

    /// Read the stored password verifier.
    async fn read_credential(&self, username: &str) -> Result<String>;

    /// Names of every stored message for the account, in no
    /// particular order. The credential record is not a message.
    async fn list_messages(&self, username: &str) -> Result<Vec<String>>;

    async fn read_message(&self, username: &str, name: &str) -> Result<Email>;

    /// Durably store a message under a fresh unique name.
    async fn write_message(&self, username: &str, email: &Email) -> Result<()>;

    /// Archive an undeliverable message under a fresh unique name.
    async fn write_dead_letter(&self, email: &Email) -> Result<()>;

    /// Byte total of every file in the account directory, credential
    /// record included.
    async fn account_disk_usage(&self, username: &str) -> Result<u64>;
}

/// Flat-file [`Storage`] backend rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open the store rooted at `root`, creating the root and the
    /// dead-letter area if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(DEAD_LETTER_DIR)).await?;
        Ok(Self { root })
    }

    /// The dead-letter directory path. Exposed for audit tooling and
    /// tests; no client-facing operation reads it.
    #[must_use]
    pub fn dead_letter_dir(&self) -> PathBuf {
        self.root.join(DEAD_LETTER_DIR)
    }

    fn account_dir(&self, username: &str) -> PathBuf {
        self.root.join(username)
    }

    async fn write_unique(dir: &Path, email: &Email) -> Result<()> {
        // Message filenames are never derived from user-controlled
        // text; a random token rules out collisions and path tricks.
        let name = format!("{}.json", Uuid::new_v4());
        let body = serde_json::to_vec(email).map_err(io::Error::other)?;
        fs::write(dir.join(name), body).await?;
        Ok(())
    }
}

impl Storage for FsStorage {
    async fn create_account(&self, username: &str, verifier: &str) -> Result<()> {
        let dir = self.account_dir(username);
        // Exclusive create: two racing registrations of the same name
        // cannot both pass this point.
        fs::create_dir(&dir).await?;
        fs::write(dir.join(CREDENTIAL_FILE), verifier).await?;
        Ok(())
    }

    async fn account_exists(&self, username: &str) -> Result<bool> {
        Ok(fs::try_exists(self.account_dir(username)).await?)
    }

    async fn read_credential(&self, username: &str) -> Result<String> {
        Ok(fs::read_to_string(self.account_dir(username).join(CREDENTIAL_FILE)).await?)
    }

    async fn list_messages(&self, username: &str) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(self.account_dir(username)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != CREDENTIAL_FILE && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn read_message(&self, username: &str, name: &str) -> Result<Email> {
        let bytes = fs::read(self.account_dir(username).join(name)).await?;
        let email = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(email)
    }

    async fn write_message(&self, username: &str, email: &Email) -> Result<()> {
        Self::write_unique(&self.account_dir(username), email).await
    }

    async fn write_dead_letter(&self, email: &Email) -> Result<()> {
        Self::write_unique(&self.dead_letter_dir(), email).await
    }

    async fn account_disk_usage(&self, username: &str) -> Result<u64> {
        let mut entries = fs::read_dir(self.account_dir(username)).await?;
        let mut total = 0;
        while let Some(entry) = entries.next_entry().await? {
            total += entry.metadata().await?.len();
        }
        Ok(total)
    }
}
