//! Mailbox operations
//!
//! Listing, fetching, appending and stats over one account's stored
//! messages. `list` and `fetch` re-derive the same descending-by-date
//! ordering, so an index obtained from a listing stays valid until new
//! mail arrives for the account.

#![allow(clippy::future_not_send)]

use crate::error::{Error, Result};
use crate::proto::Email;
use crate::storage::Storage;

/// Render one line of the inbox listing.
///
/// The index shown here is the 1-based index `fetch` accepts.
#[must_use]
pub fn summary_line(index: usize, email: &Email) -> String {
    format!(
        "#{index} [{}] {} ({})",
        email.sender, email.subject, email.date
    )
}

/// All messages for the account, most recent first.
///
/// Dates are sortable ISO-8601 UTC strings, so lexicographic order is
/// chronological order; subject breaks ties to keep the order total.
async fn sorted_messages<S: Storage>(storage: &S, username: &str) -> Result<Vec<Email>> {
    let mut messages = Vec::new();
    for name in storage.list_messages(username).await? {
        messages.push(storage.read_message(username, &name).await?);
    }
    messages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.subject.cmp(&a.subject)));
    Ok(messages)
}

/// Formatted summary lines for the account, most recent first. An
/// empty mailbox yields an empty list, not an error.
///
/// # Errors
///
/// Returns [`Error::Io`] if a stored message cannot be read.
pub async fn list<S: Storage>(storage: &S, username: &str) -> Result<Vec<String>> {
    let lines = sorted_messages(storage, username)
        .await?
        .iter()
        .enumerate()
        .map(|(i, email)| summary_line(i + 1, email))
        .collect();
    Ok(lines)
}

/// The message at 1-based `choice` in the same ordering [`list`] uses.
///
/// # Errors
///
/// Returns [`Error::InvalidIndex`] when `choice` is outside
/// `[1, count]`; reads nothing and writes nothing in that case beyond
/// re-deriving the ordering.
pub async fn fetch<S: Storage>(storage: &S, username: &str, choice: usize) -> Result<Email> {
    let mut messages = sorted_messages(storage, username).await?;
    if choice == 0 || choice > messages.len() {
        return Err(Error::InvalidIndex(choice));
    }
    Ok(messages.swap_remove(choice - 1))
}

/// Durably append a message to the account's mailbox.
///
/// # Errors
///
/// Returns [`Error::Io`] if the message cannot be written.
pub async fn append<S: Storage>(storage: &S, username: &str, email: &Email) -> Result<()> {
    storage.write_message(username, email).await
}

/// Message count and on-disk byte total for the account.
///
/// Convention: the count covers messages only, while the byte total
/// covers every file in the account directory, credential record
/// included.
///
/// # Errors
///
/// Returns [`Error::Io`] if the account directory cannot be read.
pub async fn stats<S: Storage>(storage: &S, username: &str) -> Result<(usize, u64)> {
    let count = storage.list_messages(username).await?.len();
    let size = storage.account_disk_usage(username).await?;
    Ok((count, size))
}
