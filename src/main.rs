//!
//! cas_client binary
//! -----------------
//! Command-line entry point for the CAS client application. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cas_client::config::{self, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if config::wants_help(&args) {
        println!("{}", config::USAGE);
        return Ok(());
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = ServerConfig::from_env_and_args(&args);
    info!(
        target: "startup",
        "cas_client starting: RUST_LOG='{}', http_port={}, cas_addr={}",
        rust_log, config.http_port, config.cas_addr
    );

    cas_client::server::run_with_config(config).await
}
