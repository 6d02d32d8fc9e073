use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::runtime::{bootstrap, run, DbFactory, DbOptions, RunOptions, ShutdownOptions};
use modkit::{ModuleRegistry, RegistryBuilder};
use modkit_db::{ConnectOpts, DbHandle};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use user_directory::contract::{client::UserDirectoryApi, model::User};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MEMORY_DSN: &str = "sqlite::memory:";

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(Arc<AppConfigProvider>);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// DSN with the password masked, for logs and error messages.
fn redact_dsn(dsn: &str) -> String {
    if let Ok(mut url) = url::Url::parse(dsn) {
        if url.password().is_some() && url.set_password(Some("***")).is_ok() {
            return url.into();
        }
    }
    dsn.to_owned()
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// User Directory Server - CRUD service for user records
#[derive(Parser)]
#[command(name = "user-directory-server")]
#[command(about = "User Directory Server - CRUD service for user records")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database instead of the configured one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Print all user records from the database
    Dump,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    // Apply CLI overrides (port / verbosity), then derive the ingress address
    config.apply_cli_overrides(&args);
    seed_ingress_bind_addr(&mut config);

    // Initialize logging
    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("User Directory Server starting");

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
        Commands::Dump => dump_users(config, args).await,
    }
}

/// `modules.api_ingress.bind_addr` defaults to `server.host:server.port`.
fn seed_ingress_bind_addr(config: &mut AppConfig) {
    let addr = config.server_addr();
    let entry = config
        .modules
        .entry(api_ingress::MODULE_NAME.to_string())
        .or_insert_with(|| serde_json::json!({}));
    if let Some(obj) = entry.as_object_mut() {
        obj.entry("bind_addr")
            .or_insert_with(|| serde_json::Value::String(addr));
    }
}

fn build_registry() -> Result<ModuleRegistry> {
    let mut builder = RegistryBuilder::default();
    builder
        .module(
            api_ingress::MODULE_NAME,
            &[],
            Arc::new(api_ingress::ApiIngress::default()),
        )
        .rest_host()
        .stateful();
    user_directory::UserDirectory::register(&mut builder);
    Ok(builder.build_topo_sorted()?)
}

fn config_provider(config: &AppConfig) -> Arc<dyn modkit::ConfigProvider> {
    Arc::new(ModkitConfigAdapter(Arc::new(AppConfigProvider::new(
        config.clone(),
    ))))
}

/// Resolve the DSN and pool options for the configured database.
/// `--mock` swaps in a private in-memory SQLite database.
fn resolve_database(
    db_config: Option<&DatabaseConfig>,
    mock: bool,
    base_dir: &Path,
) -> Result<Option<(String, ConnectOpts)>> {
    if mock {
        return Ok(Some((MEMORY_DSN.to_string(), ConnectOpts::in_memory())));
    }
    let Some(db_config) = db_config else {
        return Ok(None);
    };

    let mut dsn = db_config.url.trim().to_owned();
    if dsn.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    // Absolutize sqlite DSNs to avoid cwd issues
    if dsn.starts_with("sqlite:") {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir)?;
    }
    if dsn == MEMORY_DSN {
        return Ok(Some((dsn, ConnectOpts::in_memory())));
    }

    let opts = ConnectOpts {
        max_conns: db_config.max_conns.or(Some(10)),
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: db_config
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
        ..Default::default()
    };
    Ok(Some((dsn, opts)))
}

fn db_options(config: &AppConfig, mock: bool) -> Result<DbOptions> {
    let base_dir = PathBuf::from(&config.server.home_dir);
    let Some((dsn, opts)) = resolve_database(config.database.as_ref(), mock, &base_dir)? else {
        tracing::warn!("No database configuration found, users are kept in memory");
        return Ok(DbOptions::None);
    };

    let factory: DbFactory = Box::new(move || {
        Box::pin(async move {
            let shown = redact_dsn(&dsn);
            tracing::info!("Connecting to database: {}", shown);
            let db = DbHandle::connect(&dsn, opts)
                .await
                .with_context(|| format!("cannot connect to '{shown}'"))?;
            tracing::info!("Connected DB backend: {:?}", db.engine());
            Ok::<_, anyhow::Error>(Arc::new(db))
        })
    });
    Ok(DbOptions::Auto(factory))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let run_options = RunOptions {
        registry: build_registry()?,
        modules_cfg: config_provider(&config),
        db: db_options(&config, args.mock)?,
        shutdown: ShutdownOptions::Signals,
    };

    run(run_options).await
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // Modules must resolve and the ingress address must parse
    build_registry()?;
    let ingress = config
        .modules
        .get(api_ingress::MODULE_NAME)
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let ingress: api_ingress::ApiIngressConfig =
        serde_json::from_value(ingress).context("Invalid modules.api_ingress section")?;
    ingress
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("Invalid bind address '{}'", ingress.bind_addr))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}

/// Connect, migrate, list every user through the published client and print them.
async fn dump_users(config: AppConfig, args: CliArgs) -> Result<()> {
    if config.database.is_none() && !args.mock {
        return Err(anyhow!("dump needs a database section in the configuration"));
    }

    let boot = bootstrap(
        build_registry()?,
        config_provider(&config),
        db_options(&config, args.mock)?,
    )
    .await?;

    let result = async {
        let api = boot.hub.get::<dyn UserDirectoryApi>()?;
        let users = api.list_users().await.context("failed to fetch users")?;
        Ok::<_, anyhow::Error>(users)
    }
    .await;

    // Close the pool even when the query failed
    boot.close().await;

    print!("{}", format_user_records(&result?));
    Ok(())
}

fn format_user_records(users: &[User]) -> String {
    let rule = "-".repeat(40);
    let mut out = format!("User Records:\n{rule}\n");
    for u in users {
        out.push_str(&format!("ID: {} | Name: {} | Email: {}\n", u.id, u.name, u.email));
    }
    out.push_str(&rule);
    out.push('\n');
    out
}
