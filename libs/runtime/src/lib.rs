//! Process-level runtime support: layered configuration, logging setup and
//! home directory resolution shared by the server binaries.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section,
    ServerConfig,
};
pub use paths::home_dir::{resolve_home_dir, HomeDirError};

/// Adapter exposing the `modules` bag of an [`AppConfig`] by module name.
#[derive(Debug, Clone)]
pub struct AppConfigProvider {
    config: AppConfig,
}

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Raw JSON section for the given module, if configured.
    pub fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.config.modules.get(module_name)
    }
}
