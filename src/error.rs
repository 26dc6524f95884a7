//! Error types for postdrop

use thiserror::Error;

/// Which half of a credential check failed.
///
/// The wire-visible message is the same generic string for both
/// variants so a client cannot probe which usernames exist; logs and
/// tests still need to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No account with that canonical username.
    UnknownUser,
    /// The account exists but the password verifier did not match.
    BadPassword,
}

/// Why a message could not be delivered and was archived to the
/// dead-letter area instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("the recipient does not exist on this server")]
    UnknownRecipient,
    #[error("the recipient is external to this server")]
    ExternalRecipient,
}

#[derive(Error, Debug)]
pub enum Error {
    /// User-fixable input problems. Every unmet rule is listed, not
    /// just the first one found.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// Unknown user or wrong password.
    #[error("invalid username or password")]
    Auth(AuthFailure),

    /// Inbox fetch index outside `[1, count]`.
    #[error("no message at index {0}")]
    InvalidIndex(usize),

    /// Send failed; the message was preserved in the dead-letter area.
    #[error("{0}")]
    Delivery(DeliveryFailure),

    /// Framing failure or peer disconnect. Never answered on the wire;
    /// the connection is torn down instead.
    #[error("transport error: {0}")]
    Transport(String),

    /// Filesystem or socket failure. Fatal to the request it occurred
    /// in, never reported to the peer as success.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
