//! Server configuration

use crate::error::{Error, Result};
use crate::proto::APP_PORT;
use std::env;
use std::path::PathBuf;

/// Listener and storage configuration for a [`crate::MailServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the on-disk mail store.
    pub data_dir: PathBuf,
    /// Domain this server delivers for. A destination under any other
    /// domain is archived to the dead-letter area instead.
    pub domain: String,
}

impl ServerConfig {
    /// Load server configuration from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional
    /// (with defaults):
    /// - `POSTDROP_HOST` (default: `127.0.0.1`)
    /// - `POSTDROP_PORT` (default: the fixed application port)
    /// - `POSTDROP_DATA_DIR` (default: `postdrop-data`)
    /// - `POSTDROP_DOMAIN` (default: `postdrop.local`)
    ///
    /// # Errors
    ///
    /// Returns an error if `POSTDROP_PORT` is set but not a valid port
    /// number.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("POSTDROP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("POSTDROP_PORT")
                .unwrap_or_else(|_| APP_PORT.to_string())
                .parse()
                .map_err(|e| Error::Config(format!("invalid POSTDROP_PORT: {e}")))?,
            data_dir: env::var("POSTDROP_DATA_DIR")
                .unwrap_or_else(|_| "postdrop-data".to_string())
                .into(),
            domain: env::var("POSTDROP_DOMAIN").unwrap_or_else(|_| "postdrop.local".to_string()),
        })
    }
}
