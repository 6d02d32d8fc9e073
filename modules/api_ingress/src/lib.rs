//! HTTP ingress: the single REST host. Owns the global middleware stack and
//! the listening socket; REST modules only contribute routes.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use arc_swap::ArcSwap;
use axum::{extract::DefaultBodyLimit, middleware::from_fn, routing::get, Router};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub const MODULE_NAME: &str = "api_ingress";

/// How long `stop` waits for in-flight requests to drain.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

struct Running {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    // Finalized router from the REST phase, taken by `start`
    final_router: Mutex<Option<Router>>,
    running: Mutex<Option<Running>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            final_router: Mutex::new(None),
            running: Mutex::new(None),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.addr)
    }

    /// Wrap `router` with the global middleware stack (outermost first):
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id -> Timeout -> CORS -> BodyLimit
    pub fn apply_middleware(&self, router: Router) -> Router {
        let cfg = self.config.load();
        let x_request_id = request_id::header();

        let cors = cfg.cors_enabled.then(CorsLayer::permissive);

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    request_id::MakeReqId,
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(request_id::create_trace_layer())
                .layer(from_fn(request_id::push_req_id_to_extensions))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)))
                .option_layer(cors)
                .layer(DefaultBodyLimit::max(cfg.body_limit_bytes)),
        )
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> anyhow::Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(module = MODULE_NAME, bind_addr = %cfg.bind_addr, "config loaded");
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// REST host role: prepare/finalize the router, but do not start the server here.
impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(
        &self,
        _ctx: &modkit::context::ModuleCtx,
        router: Router,
    ) -> anyhow::Result<Router> {
        tracing::debug!("REST host prepared base router with health check");
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(
        &self,
        _ctx: &modkit::context::ModuleCtx,
        router: Router,
    ) -> anyhow::Result<Router> {
        let router = self.apply_middleware(router);
        *self.final_router.lock() = Some(router.clone());
        tracing::debug!("REST host finalized router");
        Ok(router)
    }
}

#[async_trait]
impl modkit::contracts::StatefulModule for ApiIngress {
    /// Bind the socket, then serve in a background task until `cancel` fires or `stop` is called.
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", cfg.bind_addr))?;

        let stored = { self.final_router.lock().take() };
        let router = match stored {
            Some(r) => r,
            None => {
                tracing::debug!("No router from REST phase, serving health check only");
                self.apply_middleware(Router::new().route("/health", get(web::health_check)))
            }
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local = listener.local_addr()?;
        tracing::info!("HTTP server bound on {}", local);

        let server_cancel = cancel.child_token();
        let shutdown = {
            let c = server_cancel.clone();
            async move {
                c.cancelled().await;
                tracing::info!("HTTP server shutting down gracefully");
            }
        };

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(|e| anyhow::anyhow!(e))
        });

        *self.running.lock() = Some(Running {
            addr: local,
            cancel: server_cancel,
            task,
        });
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(running) = self.running.lock().take() else {
            return Ok(());
        };
        running.cancel.cancel();

        match tokio::time::timeout(STOP_TIMEOUT, running.task).await {
            Ok(Ok(res)) => res,
            Ok(Err(join)) => Err(anyhow::anyhow!("HTTP server task failed: {join}")),
            Err(_) => {
                tracing::warn!("HTTP server did not stop within {:?}", STOP_TIMEOUT);
                Ok(())
            }
        }
    }
}
