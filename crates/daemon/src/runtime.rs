use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::{ws, EventBus};
use crate::config::ServerConfig;
use crate::save::{Diagnostics, FaultReport, SaveFromControls, SaveOrchestrator};
use crate::startup::{bind_listener, ProjectPaths};

pub struct EmbeddedServerHandle {
    shutdown_tx: broadcast::Sender<()>,
    local_addr: SocketAddr,
    bus: EventBus,
    faults_tx: broadcast::Sender<FaultReport>,
    task: Option<JoinHandle<()>>,
}

impl EmbeddedServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The server's event bus, for hosts that want to observe or inject events.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Receive a [`FaultReport`] for every save that fails from now on.
    pub fn subscribe_faults(&self) -> broadcast::Receiver<FaultReport> {
        self.faults_tx.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub async fn wait(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EmbeddedServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub async fn start_embedded() -> Result<EmbeddedServerHandle> {
    let paths = ProjectPaths::resolve()?;
    let config = ServerConfig::load(&paths.root).context("failed to load server config")?;
    start_embedded_with(paths, config).await
}

pub async fn run_standalone() -> Result<()> {
    let paths = ProjectPaths::resolve()?;
    let config = ServerConfig::load(&paths.root).context("failed to load server config")?;
    run_standalone_with(paths, config).await
}

pub async fn run_standalone_with(paths: ProjectPaths, config: ServerConfig) -> Result<()> {
    let listener = bind_listener(&config.listen_addr).await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = ctrl_c_tx.send(());
    });

    info!(
        root = %paths.root.display(),
        listen_addr = %config.listen_addr,
        channel_path = %config.channel_path,
        "standalone story save server started"
    );
    let bus = EventBus::new(config.event_buffer);
    let handler = start_save_handler(&paths, &config, &bus, Diagnostics::new());
    serve_until_shutdown(listener, &config.channel_path, bus, handler, shutdown_rx)
        .await
        .context("standalone server exited with error")
}

pub async fn start_embedded_with(
    paths: ProjectPaths,
    config: ServerConfig,
) -> Result<EmbeddedServerHandle> {
    let listener = bind_listener(&config.listen_addr).await?;
    let local_addr = listener.local_addr().context("listener has no local address")?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    let bus = EventBus::new(config.event_buffer);
    let (faults_tx, _) = broadcast::channel(config.event_buffer);
    let diagnostics = Diagnostics::new().with_telemetry(faults_tx.clone());
    let handler = start_save_handler(&paths, &config, &bus, diagnostics);
    let server_bus = bus.clone();
    let task = tokio::spawn(async move {
        if let Err(error) =
            serve_until_shutdown(listener, &config.channel_path, server_bus, handler, shutdown_rx)
                .await
        {
            warn!(?error, "embedded server terminated unexpectedly");
        }
    });

    info!(%local_addr, root = %paths.root.display(), "embedded story save server started");
    Ok(EmbeddedServerHandle { shutdown_tx, local_addr, bus, faults_tx, task: Some(task) })
}

/// The handler subscribes before the server task starts, so nothing
/// delivered after `start_embedded_with` returns can miss it.
fn start_save_handler(
    paths: &ProjectPaths,
    config: &ServerConfig,
    bus: &EventBus,
    diagnostics: Diagnostics,
) -> SaveFromControls {
    let orchestrator = Arc::new(
        SaveOrchestrator::new(&paths.root)
            .with_serialized_writes(config.serialize_writes)
            .with_diagnostics(diagnostics),
    );
    SaveFromControls::start(bus.clone(), orchestrator)
}

async fn serve_until_shutdown(
    listener: TcpListener,
    channel_path: &str,
    bus: EventBus,
    handler: SaveFromControls,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let result = axum::serve(listener, ws::router(bus, channel_path))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .context("channel websocket server failed");

    handler.wait().await;
    info!("story save server stopped");
    result
}
