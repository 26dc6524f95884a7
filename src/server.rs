//! TCP listener and per-connection request loop
//!
//! The server owns connection lifecycle end to end: it accepts on the
//! listening socket, runs one decode-dispatch-encode loop per
//! connection, and tears a connection (and its session) down on
//! transport failure, storage failure, or an explicit quit. Requests
//! on one connection are served strictly in arrival order; across
//! connections the tokio reactor decides.

use crate::config::ServerConfig;
use crate::dispatch::{Dispatch, dispatch};
use crate::error::Result;
use crate::frame::{read_frame, write_frame};
use crate::proto::Request;
use crate::session::Session;
use crate::storage::FsStorage;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// A bound, ready-to-run mail server.
pub struct MailServer {
    listener: TcpListener,
    storage: FsStorage,
    config: Arc<ServerConfig>,
}

impl MailServer {
    /// Open the mail store and bind the listening socket.
    ///
    /// Binding to port 0 asks the OS for a free port; see
    /// [`MailServer::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be prepared or
    /// the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let storage = FsStorage::open(&config.data_dir).await?;
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, domain = %config.domain, "listening");
        Ok(Self {
            listener,
            storage,
            config: Arc::new(config),
        })
    }

    /// The address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, serving each on its own task.
    ///
    /// # Errors
    ///
    /// Returns an error only if accepting fails fatally; per-connection
    /// failures are handled by dropping that connection.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            info!(%addr, "connection accepted");
            let storage = self.storage.clone();
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                handle_connection(stream, &storage, &config.domain).await;
                info!(%addr, "connection closed");
            });
        }
    }
}

/// Serve one connection until quit, disconnect, or failure.
///
/// The session is created unauthenticated alongside the connection
/// and dropped with it. A transport or storage failure mid-request
/// ends the loop without writing a response.
async fn handle_connection(mut stream: TcpStream, storage: &FsStorage, domain: &str) {
    let mut session = Session::new();

    loop {
        let request: Request = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                debug!("connection dropped: {e}");
                break;
            }
        };

        match dispatch(storage, domain, &mut session, request).await {
            Ok(Dispatch::Reply(response)) => {
                if let Err(e) = write_frame(&mut stream, &response).await {
                    debug!("failed to answer: {e}");
                    break;
                }
            }
            Ok(Dispatch::Quiet) => {}
            Ok(Dispatch::Close) => break,
            Err(e) => {
                warn!("request aborted: {e}");
                break;
            }
        }
    }
}
