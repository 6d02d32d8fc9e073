//! ModKit runtime runner.
//!
//! One stable [`ModuleCtx`] is built up front and reused across all phases
//! (init → db → rest → start → wait → stop). Shutdown can be driven by OS
//! signals, an external `CancellationToken`, or an arbitrary future.

use crate::client_hub::ClientHub;
use crate::context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
use crate::registry::ModuleRegistry;
use crate::runtime::shutdown;
use anyhow::Context as _;
use modkit_db::DbHandle;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Deferred database connection, opened once during bootstrap.
pub type DbFactory = Box<
    dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<Arc<DbHandle>>> + Send>> + Send,
>;

/// How the runtime should provide a DB to modules.
pub enum DbOptions {
    /// No database integration; `ModuleCtx::db()` is `None` and the db phase is skipped.
    None,
    /// Connect through the factory, then run every module's migrations.
    Auto(DbFactory),
}

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    pub registry: ModuleRegistry,
    /// Provider of module config sections (raw JSON by module name).
    pub modules_cfg: Arc<dyn ConfigProvider>,
    pub db: DbOptions,
    pub shutdown: ShutdownOptions,
}

/// Modules after the init and db phases; enough for one-shot commands that
/// only need the published clients.
pub struct Bootstrapped {
    pub registry: ModuleRegistry,
    pub ctx: ModuleCtx,
    pub hub: Arc<ClientHub>,
    pub db: Option<Arc<DbHandle>>,
}

impl Bootstrapped {
    /// Close the database pool, if one was opened.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            tracing::debug!("database pool closed");
        }
    }
}

/// Connect the database (if any), then run the init and db phases.
pub async fn bootstrap(
    registry: ModuleRegistry,
    modules_cfg: Arc<dyn ConfigProvider>,
    db: DbOptions,
) -> anyhow::Result<Bootstrapped> {
    let hub = Arc::new(ClientHub::default());

    let db = match db {
        DbOptions::None => None,
        DbOptions::Auto(factory) => Some(factory().await.context("database connection failed")?),
    };

    let mut builder = ModuleCtxBuilder::new()
        .with_client_hub(hub.clone())
        .with_config_provider(modules_cfg);
    if let Some(db) = &db {
        builder = builder.with_db(db.clone());
    }
    let ctx = builder.build();

    tracing::info!("Phase: init");
    registry.run_init_phase(&ctx).await?;

    if let Some(db) = &db {
        tracing::info!("Phase: db");
        registry.run_db_phase(db).await?;
    }

    Ok(Bootstrapped {
        registry,
        ctx,
        hub,
        db,
    })
}

/// Full cycle: init → db → rest (sync) → start → wait → stop.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = shutdown::wait_for_shutdown().await {
                    tracing::warn!(
                        error = %e,
                        "shutdown: signal listener failed; falling back to ctrl_c()"
                    );
                    let _ = tokio::signal::ctrl_c().await;
                }
                tracing::info!("shutdown: signal received");
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let boot = bootstrap(opts.registry, opts.modules_cfg, opts.db).await?;

    tracing::info!("Phase: rest (sync)");
    let _ = boot.registry.run_rest_phase(&boot.ctx, axum::Router::new())?;

    tracing::info!("Phase: start");
    boot.registry.run_start_phase(cancel.clone()).await?;

    cancel.cancelled().await;

    tracing::info!("Phase: stop");
    boot.registry.run_stop_phase(cancel).await?;
    boot.close().await;
    Ok(())
}
