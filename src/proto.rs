//! Wire protocol vocabulary
//!
//! Every frame on the wire carries one JSON document of the shape
//! `{"header": "<KIND>", "payload": {...}}`, with the payload omitted
//! for kinds that carry none. [`Request`] and [`Response`] model that
//! document as adjacently tagged serde enums, so the dispatcher never
//! touches raw JSON.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Fixed application port shared by client and server.
pub const APP_PORT: u16 = 41_200;

/// Username and password as supplied by the client. The username is
/// not yet canonicalized at this point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One stored or in-flight mail message. Round-trips through storage
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub destination: String,
    pub subject: String,
    /// ISO-8601 UTC timestamp. Lexicographic order on this string is
    /// chronological order.
    pub date: String,
    pub content: String,
}

/// 1-based inbox index chosen from a previous listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChoice {
    pub choice: usize,
}

/// A client request frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "header", content = "payload")]
pub enum Request {
    #[serde(rename = "AUTH_REGISTER")]
    AuthRegister(Credentials),
    #[serde(rename = "AUTH_LOGIN")]
    AuthLogin(Credentials),
    /// Fire-and-forget: the server clears the session identity and
    /// sends no response.
    #[serde(rename = "AUTH_LOGOUT")]
    AuthLogout,
    #[serde(rename = "INBOX_LIST")]
    InboxList,
    #[serde(rename = "INBOX_FETCH")]
    InboxFetch(EmailChoice),
    #[serde(rename = "EMAIL_SEND")]
    EmailSend(Email),
    #[serde(rename = "STATS_REQUEST")]
    Stats,
    /// Courtesy notice before disconnecting. No response is written.
    #[serde(rename = "BYE")]
    Bye,
}

impl Request {
    /// Wire name of this request kind, for logging. Never includes
    /// the payload, which may carry credentials.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthRegister(_) => "AUTH_REGISTER",
            Self::AuthLogin(_) => "AUTH_LOGIN",
            Self::AuthLogout => "AUTH_LOGOUT",
            Self::InboxList => "INBOX_LIST",
            Self::InboxFetch(_) => "INBOX_FETCH",
            Self::EmailSend(_) => "EMAIL_SEND",
            Self::Stats => "STATS_REQUEST",
            Self::Bye => "BYE",
        }
    }
}

/// Payload of a successful response, when the operation returns data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OkPayload {
    /// Inbox listing: one pre-formatted summary line per message,
    /// most recent first.
    EmailList { email_list: Vec<String> },
    /// A full message, exactly as it was stored.
    EmailContent(Email),
    /// Message count and on-disk byte total for the account.
    Stats { count: usize, size: u64 },
}

/// A server response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "header", content = "payload")]
pub enum Response {
    #[serde(rename = "OK")]
    Ok(Option<OkPayload>),
    #[serde(rename = "ERROR")]
    Error { error_message: String },
}

impl Response {
    /// Plain success with no payload.
    #[must_use]
    pub const fn ok() -> Self {
        Self::Ok(None)
    }

    /// Failure carrying a user-visible message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error_message: message.into(),
        }
    }
}

/// The current time as the sortable ISO-8601 UTC string used in
/// message dates.
#[must_use]
pub fn current_utc_time() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
