//! Host adapters
//!
//! Two thin shells around the same router: a standalone server that runs
//! until Ctrl-C, and an embedded server that runs on a background task and
//! is stopped by its owner. Both build their state through [`bootstrap`].

use anyhow::{Context, Result};
use auth::{JwtService, UserRepository};
use common::database::{close_pool, health_check, init_pool};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{error, info};

use crate::{
    config::AppConfig, reports::ReportService, repositories::ProductRepository, routes,
    state::AppState,
};

/// Open the datastore, seed defaults and assemble the shared state
pub async fn bootstrap(config: &AppConfig) -> Result<AppState> {
    let pool = init_pool(&config.database).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let users = UserRepository::new(pool.clone(), config.hashing);
    if users.seed_default_admin().await? {
        info!("Seeded default administrator account");
    }

    let products = ProductRepository::new(pool.clone(), config.server.stock_policy());
    let seeded = products.seed_catalog().await?;
    if seeded > 0 {
        info!("Seeded {} sample products", seeded);
    }
    let reconciled = products.reconcile_statuses().await?;
    if reconciled > 0 {
        info!("Re-derived stock status for {} products", reconciled);
    }

    Ok(AppState {
        reports: ReportService::new(pool.clone()),
        jwt: JwtService::new(config.jwt.clone()),
        db_pool: pool,
        users,
        products,
    })
}

/// Serve on the configured address until Ctrl-C, then close the pool
pub async fn run_standalone(config: AppConfig) -> Result<()> {
    let state = bootstrap(&config).await?;
    let pool = state.db_pool.clone();
    let app = routes::create_router(
        state,
        config.server.normalized_prefix(),
        config.server.cors_origins()?,
    );

    let (host, port) = config.server.bind_address();
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    let addr = listener.local_addr()?;
    info!(
        "API service listening on {} (prefix {:?})",
        addr,
        config.server.normalized_prefix()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(&pool).await;
    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// A server running on a background task
pub struct EmbeddedServer {
    addr: SocketAddr,
    pool: SqlitePool,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl EmbeddedServer {
    /// Bootstrap and start serving. Port 0 binds an ephemeral port.
    pub async fn start(config: AppConfig) -> Result<Self> {
        let state = bootstrap(&config).await?;
        let pool = state.db_pool.clone();
        let app = routes::create_router(
            state,
            config.server.normalized_prefix(),
            config.server.cors_origins()?,
        );

        let (host, port) = config.server.bind_address();
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!("Embedded API service listening on {}", addr);
        Ok(Self {
            addr,
            pool,
            shutdown_tx,
            handle,
        })
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections, wait for in-flight requests, close the pool
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        self.handle
            .await
            .context("Embedded server task panicked")??;

        close_pool(&self.pool).await;
        info!("Embedded API service stopped");
        Ok(())
    }
}
