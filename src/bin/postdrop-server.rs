#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Store-and-forward mail server daemon

use clap::Parser;
use postdrop::{MailServer, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postdrop-server")]
#[command(
    about = "Store-and-forward mail server speaking a length-prefixed JSON protocol"
)]
struct Args {
    /// Address to listen on (overrides POSTDROP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides POSTDROP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Root of the on-disk mail store (overrides POSTDROP_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Domain this server delivers for (overrides POSTDROP_DOMAIN)
    #[arg(long)]
    domain: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(domain) = args.domain {
        config.domain = domain;
    }

    let server = MailServer::bind(config).await?;
    server.run().await?;
    Ok(())
}
