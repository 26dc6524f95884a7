//! postdrop store-and-forward mail server
//!
//! A single server process accepts many concurrent client
//! connections, authenticates users, stores messages as per-user
//! files, and serves read/send/stats requests over a length-prefixed
//! JSON request/response protocol. Delivery is strictly local: mail
//! addressed to another domain, or to a local name with no account,
//! is archived to a dead-letter area and reported as a failure.

pub mod account;
mod config;
pub mod dispatch;
mod error;
pub mod frame;
pub mod mailbox;
pub mod proto;
mod server;
pub mod session;
pub mod storage;

pub use config::ServerConfig;
pub use error::{AuthFailure, DeliveryFailure, Error, Result};
pub use proto::{APP_PORT, Email, Request, Response};
pub use server::MailServer;
