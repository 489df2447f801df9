//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble the service stacks from a validated configuration
//! - Bind both listeners and start serving
//! - Start the config watcher and apply instance list changes
//! - Wait for a signal, then shut everything down
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Both listeners are bound before either server starts
//! - A reload only ever touches the instance list

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::watcher::{restart_required, ConfigWatcher};
use crate::config::ProxyConfig;
use crate::http::{HttpServer, SharedSupply};
use crate::lifecycle::{signals, Shutdown};
use crate::proxy::error::ProxyResult;
use crate::proxy::facade::ProxyingMiddleware;
use crate::service::{InstrumentingMiddleware, LocalHotelSupply, LoggingMiddleware};

/// The proxying layer of the business stack.
pub type BusinessProxy = ProxyingMiddleware<Arc<LocalHotelSupply>>;

/// Service stacks served by the two HTTP servers.
pub struct Services {
    /// logging → instrumenting → proxy → local
    pub business: SharedSupply,
    /// logging → local
    pub upstream: SharedSupply,
    /// Handle used to apply instance reloads.
    pub proxy: Arc<BusinessProxy>,
}

/// Build both service stacks from configuration.
pub fn build_services(config: &ProxyConfig) -> ProxyResult<Services> {
    let local = Arc::new(LocalHotelSupply::new());
    let proxy = Arc::new(ProxyingMiddleware::new(config, local.clone())?);

    let business: SharedSupply = Arc::new(LoggingMiddleware::new(InstrumentingMiddleware::new(
        proxy.clone(),
    )));
    let upstream: SharedSupply = Arc::new(LoggingMiddleware::new(local));

    Ok(Services {
        business,
        upstream,
        proxy,
    })
}

/// Apply configuration updates until the channel closes or shutdown fires.
pub async fn apply_config_updates<S>(
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut current: ProxyConfig,
    proxy: Arc<ProxyingMiddleware<S>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(mut next) = update else { break };
                apply_update(&current, &mut next, &proxy);
                current = next;
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Config update task stopped");
}

fn apply_update<S>(current: &ProxyConfig, next: &mut ProxyConfig, proxy: &ProxyingMiddleware<S>) {
    let stale = restart_required(current, next);
    if !stale.is_empty() {
        tracing::warn!(sections = ?stale, "Changed settings take effect after a restart");
    }

    if current.upstream.instances == next.upstream.instances {
        return;
    }
    if proxy.reload_instances(&next.upstream.instances).is_err() {
        // Keep comparing against what is actually published.
        next.upstream.instances = current.upstream.instances.clone();
    }
}

/// Run both servers until a shutdown signal arrives.
pub async fn run(
    config: ProxyConfig,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let services = build_services(&config)?;

    let upstream_listener = TcpListener::bind(&config.listener.upstream_bind_address).await?;
    let business_listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let upstream = tokio::spawn(
        HttpServer::upstream(&config, services.upstream).run(upstream_listener, shutdown.subscribe()),
    );
    let business = tokio::spawn(
        HttpServer::business(&config, services.business).run(business_listener, shutdown.subscribe()),
    );

    // The watcher stops when dropped, so it lives until shutdown.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            let handle = watcher.run()?;
            tokio::spawn(apply_config_updates(
                updates,
                config.clone(),
                services.proxy.clone(),
                shutdown.subscribe(),
            ));
            Some(handle)
        }
        None => None,
    };

    supervise(business, upstream, &shutdown, signals::shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

type ServerTask = JoinHandle<Result<(), std::io::Error>>;

/// Serve until `signal` fires or a server stops on its own, then shut both down.
///
/// A server stopping before the signal is an error, even if it stopped cleanly.
async fn supervise(
    mut business: ServerTask,
    mut upstream: ServerTask,
    shutdown: &Shutdown,
    signal: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let early_exit = tokio::select! {
        _ = signal => None,
        result = &mut business => Some(("business", result)),
        result = &mut upstream => Some(("upstream", result)),
    };
    shutdown.trigger();

    let Some((server, result)) = early_exit else {
        let (business, upstream) = futures_util::future::join(business, upstream).await;
        business??;
        upstream??;
        return Ok(());
    };

    tracing::error!(server, "HTTP server stopped before shutdown was requested");
    let remaining = if server == "business" { upstream } else { business };
    let _ = remaining.await;
    result??;
    Err(format!("{server} server stopped unexpectedly").into())
}
