// Startup: project root resolution and listener binding.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::project_config_path;

/// Resolved paths for a project the server edits stories in.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl ProjectPaths {
    /// The project root is the process working directory.
    pub fn resolve() -> Result<Self> {
        let root = std::env::current_dir().context("could not determine working directory")?;
        Self::at(root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root
            .canonicalize()
            .with_context(|| format!("project root `{}` is not accessible", root.display()))?;
        Ok(Self { config_path: project_config_path(&root), root })
    }
}

/// Bind the channel listener. The server signals readiness by accepting
/// connections on it.
pub async fn bind_listener(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind channel listener on `{addr}`"))?;
    let local_addr = listener.local_addr().context("listener has no local address")?;
    info!(%local_addr, "channel listener ready");
    Ok(listener)
}

/// Check if a server is already listening on `addr`.
pub async fn is_server_running(addr: &str) -> bool {
    tokio::net::TcpStream::connect(addr).await.is_ok()
}
