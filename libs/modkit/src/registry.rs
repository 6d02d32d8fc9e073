use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context::ModuleCtx;
use crate::contracts::{DbModule, Module, RestHostModule, RestfulModule, StatefulModule};

pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn Module>,
    pub rest: Option<Arc<dyn RestfulModule>>,
    pub rest_host: Option<Arc<dyn RestHostModule>>,
    pub db: Option<Arc<dyn DbModule>>,
    pub stateful: Option<Arc<dyn StatefulModule>>,
}

impl ModuleEntry {
    fn new(name: &'static str, deps: &'static [&'static str], core: Arc<dyn Module>) -> Self {
        Self {
            name,
            deps,
            core,
            rest: None,
            rest_host: None,
            db: None,
            stateful: None,
        }
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// The final, dependency-ordered runtime registry.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
            tracing::debug!(module = e.name, "module initialized");
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &modkit_db::DbHandle) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(dbm) = &e.db {
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: e.name,
                        source,
                    })?;
                tracing::info!(module = e.name, "migrations applied");
            }
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let Some(host_entry) = self.modules.iter().find(|e| e.rest_host.is_some()) else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        let Some(host) = host_entry.rest_host.as_ref() else {
            return Err(RegistryError::RestRequiresHost);
        };
        let host_ctx = base_ctx.clone().for_module(host_entry.name);

        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_entry.name,
                source,
            })?;

        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        host.rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_entry.name,
                source,
            })
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Reverse order; failures are logged and do not stop the remaining modules.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
        Ok(())
    }
}

/// Collects module registrations; names must be unique and there may be at
/// most one REST host. Validation happens in [`RegistryBuilder::build_topo_sorted`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
    errors: Vec<String>,
}

/// Capability binder returned by [`RegistryBuilder::module`].
pub struct ModuleSlot<'a, M> {
    builder: &'a mut RegistryBuilder,
    index: Option<usize>,
    module: Arc<M>,
}

impl RegistryBuilder {
    /// Register a module's core and declare its dependencies; chain the
    /// returned slot to attach capabilities.
    pub fn module<M: Module>(
        &mut self,
        name: &'static str,
        deps: &'static [&'static str],
        module: Arc<M>,
    ) -> ModuleSlot<'_, M> {
        let index = if self.entries.iter().any(|e| e.name == name) {
            self.errors
                .push(format!("Module '{name}' is already registered"));
            None
        } else {
            self.entries
                .push(ModuleEntry::new(name, deps, module.clone() as Arc<dyn Module>));
            Some(self.entries.len() - 1)
        };
        ModuleSlot {
            builder: self,
            index,
            module,
        }
    }

    /// Validate and order modules so that dependencies come first.
    /// Independent modules keep their registration order.
    pub fn build_topo_sorted(self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        let idx: HashMap<&'static str, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name, i))
            .collect();

        // edge dep -> module
        let mut adj = vec![Vec::<usize>::new(); self.entries.len()];
        let mut indeg = vec![0usize; self.entries.len()];
        for (u, e) in self.entries.iter().enumerate() {
            for &d in e.deps {
                let v = *idx.get(d).ok_or_else(|| RegistryError::UnknownDependency {
                    module: e.name.to_string(),
                    depends_on: d.to_string(),
                })?;
                adj[v].push(u);
                indeg[u] += 1;
            }
        }

        let mut q: VecDeque<usize> = (0..self.entries.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(u) = q.pop_front() {
            order.push(u);
            for &w in &adj[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    q.push_back(w);
                }
            }
        }

        if order.len() < self.entries.len() {
            let stuck = (0..self.entries.len())
                .filter(|&i| indeg[i] > 0)
                .map(|i| self.entries[i].name)
                .collect();
            return Err(RegistryError::CycleDetected { modules: stuck });
        }

        let mut slots: Vec<Option<ModuleEntry>> = self.entries.into_iter().map(Some).collect();
        let modules: Vec<ModuleEntry> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        tracing::info!(
            modules = ?modules.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module dependency order resolved (topo)"
        );

        Ok(ModuleRegistry { modules })
    }
}

impl<M> ModuleSlot<'_, M> {
    fn entry(&mut self) -> Option<&mut ModuleEntry> {
        self.index.map(|i| &mut self.builder.entries[i])
    }
}

impl<M: DbModule + 'static> ModuleSlot<'_, M> {
    pub fn db(mut self) -> Self {
        let m = self.module.clone() as Arc<dyn DbModule>;
        if let Some(e) = self.entry() {
            e.db = Some(m);
        }
        self
    }
}

impl<M: RestfulModule + 'static> ModuleSlot<'_, M> {
    pub fn rest(mut self) -> Self {
        let m = self.module.clone() as Arc<dyn RestfulModule>;
        if let Some(e) = self.entry() {
            e.rest = Some(m);
        }
        self
    }
}

impl<M: RestHostModule> ModuleSlot<'_, M> {
    pub fn rest_host(mut self) -> Self {
        let name = self.entry().map(|e| e.name);
        if let Some(existing) = self
            .builder
            .entries
            .iter()
            .find(|e| e.rest_host.is_some())
            .map(|e| e.name)
        {
            self.builder.errors.push(format!(
                "Multiple REST host modules detected: '{}' and '{}'. Only one REST host is allowed.",
                existing,
                name.unwrap_or("<duplicate>")
            ));
            return self;
        }
        let m = self.module.clone() as Arc<dyn RestHostModule>;
        if let Some(e) = self.entry() {
            e.rest_host = Some(m);
        }
        self
    }
}

impl<M: StatefulModule + 'static> ModuleSlot<'_, M> {
    pub fn stateful(mut self) -> Self {
        let m = self.module.clone() as Arc<dyn StatefulModule>;
        if let Some(e) = self.entry() {
            e.stateful = Some(m);
        }
        self
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no module with capability 'rest_host'")]
    RestRequiresHost,

    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("cyclic dependency detected between: {}", modules.join(", "))]
    CycleDetected { modules: Vec<&'static str> },
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModuleCtxBuilder;
    use axum::{body::Body, http::Request, routing::get};
    use parking_lot::Mutex;
    use tower::ServiceExt;

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Probe {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: log.clone(),
            })
        }
    }

    #[async_trait::async_trait]
    impl Module for Probe {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            self.log.lock().push(format!("init:{}", self.name));
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[async_trait::async_trait]
    impl StatefulModule for Probe {
        async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.lock().push(format!("start:{}", self.name));
            Ok(())
        }
        async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.lock().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    impl RestfulModule for Probe {
        fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route("/probe", get(|| async { "probe" })))
        }
    }

    impl RestHostModule for Probe {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route("/host", get(|| async { "host" })))
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.log.lock().push("finalize".into());
            Ok(router)
        }
    }

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn topo_sort_puts_dependencies_first() {
        let l = log();
        let mut b = RegistryBuilder::default();
        b.module("svc", &["host"], Probe::new("svc", &l));
        b.module("host", &[], Probe::new("host", &l));
        b.module("extra", &[], Probe::new("extra", &l));

        let reg = b.build_topo_sorted().unwrap();
        let order: Vec<_> = reg.modules().iter().map(|m| m.name).collect();
        assert_eq!(order, vec!["host", "extra", "svc"]);
    }

    #[test]
    fn unknown_dependency_error() {
        let mut b = RegistryBuilder::default();
        b.module("a", &["missing_dep"], Probe::new("a", &log()));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::UnknownDependency { module, depends_on } => {
                assert_eq!(module, "a");
                assert_eq!(depends_on, "missing_dep");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cyclic_dependency_detected() {
        let l = log();
        let mut b = RegistryBuilder::default();
        b.module("a", &["b"], Probe::new("a", &l));
        b.module("b", &["a"], Probe::new("b", &l));
        b.module("c", &[], Probe::new("c", &l));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::CycleDetected { modules } => {
                assert_eq!(modules, vec!["a", "b"]);
            }
            other => panic!("expected CycleDetected, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_and_hosts_are_reported() {
        let l = log();
        let mut b = RegistryBuilder::default();
        b.module("a", &[], Probe::new("a", &l)).rest_host();
        b.module("a", &[], Probe::new("a", &l));
        b.module("b", &[], Probe::new("b", &l)).rest_host();

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::InvalidRegistryConfiguration { errors } => {
                assert!(errors.iter().any(|e| e.contains("already registered")));
                assert!(errors.iter().any(|e| e.contains("Multiple REST host")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rest_requires_host_if_rest_modules_exist() {
        let mut b = RegistryBuilder::default();
        b.module("svc", &[], Probe::new("svc", &log())).rest();
        let reg = b.build_topo_sorted().unwrap();

        let ctx = ModuleCtxBuilder::new().build();
        let err = reg.run_rest_phase(&ctx, Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[tokio::test]
    async fn rest_phase_composes_host_and_providers() {
        let l = log();
        let mut b = RegistryBuilder::default();
        b.module("host", &[], Probe::new("host", &l)).rest_host();
        b.module("svc", &["host"], Probe::new("svc", &l)).rest();
        let reg = b.build_topo_sorted().unwrap();

        let ctx = ModuleCtxBuilder::new().build();
        let router = reg.run_rest_phase(&ctx, Router::new()).unwrap();
        assert_eq!(l.lock().as_slice(), ["finalize"]);

        for path in ["/host", "/probe"] {
            let res = router
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), 200, "{path}");
        }
    }

    #[tokio::test]
    async fn lifecycle_phases_run_in_order() {
        let l = log();
        let mut b = RegistryBuilder::default();
        b.module("b", &["a"], Probe::new("b", &l)).stateful();
        b.module("a", &[], Probe::new("a", &l)).stateful();
        let reg = b.build_topo_sorted().unwrap();

        let ctx = ModuleCtxBuilder::new().build();
        reg.run_init_phase(&ctx).await.unwrap();
        let cancel = CancellationToken::new();
        reg.run_start_phase(cancel.clone()).await.unwrap();
        reg.run_stop_phase(cancel).await.unwrap();

        assert_eq!(
            l.lock().as_slice(),
            ["init:a", "init:b", "start:a", "start:b", "stop:b", "stop:a"]
        );
    }
}
