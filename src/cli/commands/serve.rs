//! Serve command - start the HTTP API server.

use crate::config::Settings;

/// Start the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    crate::server::run_serve(host, port, settings).await
}
