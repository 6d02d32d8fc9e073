use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::{DbModule, Module, ModuleCtx, RegistryBuilder, RestfulModule};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::UserDirectoryConfig;
use crate::contract::client::UserDirectoryApi;
use crate::domain::repo::UsersRepository;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::UserDirectoryLocalClient;
use crate::infra::storage::memory::InMemoryUsersRepository;
use crate::infra::storage::sea_orm_repo::SeaOrmUsersRepository;

pub const MODULE_NAME: &str = "user_directory";

/// The user directory module: owns the `/users` resource and publishes
/// [`UserDirectoryApi`] into the client hub.
#[derive(Default)]
pub struct UserDirectory {
    // Keep the domain service behind ArcSwap for cheap read-mostly access.
    service: ArcSwapOption<Service>,
}

impl UserDirectory {
    /// Register with the db and rest capabilities.
    pub fn register(builder: &mut RegistryBuilder) -> Arc<Self> {
        let module = Arc::new(Self::default());
        builder
            .module(MODULE_NAME, &[], module.clone())
            .db()
            .rest();
        module
    }

    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }
}

#[async_trait]
impl Module for UserDirectory {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing user_directory module");

        let cfg: UserDirectoryConfig = ctx.module_config();
        debug!("Loaded user_directory config: max_name_length={}", cfg.max_name_length);

        // Wire repository (infra) to domain service (port)
        let repo: Arc<dyn UsersRepository> = match ctx.db() {
            Some(db) => {
                debug!(engine = ?db.engine(), "Using SeaORM repository");
                Arc::new(SeaOrmUsersRepository::new(db.sea()))
            }
            None => {
                info!("No database configured, using in-memory repository");
                Arc::new(InMemoryUsersRepository::new())
            }
        };
        let service = Arc::new(Service::new(
            repo,
            ServiceConfig {
                max_name_length: cfg.max_name_length,
            },
        ));

        // Store service for REST and local client
        self.service.store(Some(service.clone()));

        // Local in-process client implementation published to ClientHub
        let api: Arc<dyn UserDirectoryApi> = Arc::new(UserDirectoryLocalClient::new(service));
        ctx.client_hub().register::<dyn UserDirectoryApi>(api);
        info!("UserDirectory API exposed to ClientHub");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for UserDirectory {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running user_directory database migrations");
        crate::infra::storage::migrations::Migrator::up(&db.sea(), None).await?;
        info!("Users database migrations completed successfully");
        Ok(())
    }
}

impl RestfulModule for UserDirectory {
    fn register_rest(&self, _ctx: &ModuleCtx, router: axum::Router) -> anyhow::Result<axum::Router> {
        info!("Registering user_directory REST routes");
        let router = routes::register_routes(router, self.service()?)?;
        info!("Users REST routes registered successfully");
        Ok(router)
    }
}
