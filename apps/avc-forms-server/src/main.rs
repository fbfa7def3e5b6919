use anyhow::{anyhow, Context, Result};
use axum::{http::StatusCode, routing::get, Json, Router};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use url::Url;

use avc_forms::config::AvcFormsConfig;
use avc_forms::contract::model::NewUser;
use avc_forms::AvcForms;

mod request_id;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "avc_forms";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
/// - Adds `mode=rwc` so a missing database file is created.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
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

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create database dir {}", dir.display()))?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    match query {
        Some(q) if q.contains("mode=") => {
            out.push('?');
            out.push_str(q);
        }
        Some(q) => {
            out.push('?');
            out.push_str(q);
            out.push_str("&mode=rwc");
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// AVC Forms Server - patient form records over HTTP
#[derive(Parser)]
#[command(name = "avc-forms-server")]
#[command(about = "AVC Forms Server - patient form records over HTTP")]
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

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and start the server
    Run,
    /// Check configuration
    Check,
    /// Apply pending migrations and exit
    Migrate,
    /// Create a user account
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Grant every permission implicitly
        #[arg(long)]
        superuser: bool,
        #[arg(long)]
        staff: bool,
    },
    /// Grant patient permissions (add_patient, change_patient, delete_patient)
    Grant {
        #[arg(long)]
        username: String,
        #[arg(required = true)]
        codenames: Vec<String>,
    },
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

    // Apply CLI overrides (port / verbosity)
    config.apply_cli_overrides(&args);

    // Initialize logging
    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("AVC Forms Server starting");

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
        Commands::Migrate => {
            let db = connect_db(&config, &args).await?;
            AvcForms::migrate(&db).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::CreateUser {
            username,
            password,
            email,
            superuser,
            staff,
        } => {
            let module = open_module(&config, &args).await?;
            let mut new_user = NewUser::basic(username, password);
            new_user.email = email;
            new_user.is_superuser = superuser;
            new_user.is_staff = staff;
            let user = module.users().create_user(new_user).await?;
            println!("Created user {} ({})", user.username, user.id);
            Ok(())
        }
        Commands::Grant {
            username,
            codenames,
        } => {
            let module = open_module(&config, &args).await?;
            let user = module
                .users()
                .grant_permissions(&username, &codenames)
                .await?;
            println!(
                "User {} now holds: {}",
                user.username,
                user.permissions.join(", ")
            );
            Ok(())
        }
    }
}

/// Detect DB backend from URL scheme (sqlite/postgres).
fn detect_from_dsn(cfg: &DatabaseConfig) -> anyhow::Result<&'static str> {
    let raw = cfg.url.trim().to_owned();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case("sqlite::memory:") {
        return Ok("sqlite");
    }

    let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

async fn connect_db(config: &AppConfig, args: &CliArgs) -> Result<DatabaseConnection> {
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("No database configuration found"))?;

    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = PathBuf::from(&config.server.home_dir);

    let backend = detect_from_dsn(&db_config)?;

    // Use URL from config; override with in-memory SQLite when --mock is set
    let mut final_dsn = if args.mock {
        "sqlite::memory:".to_string()
    } else {
        db_config.url.trim().to_owned()
    };

    // Absolutize sqlite DSNs to avoid cwd issues
    if final_dsn.starts_with("sqlite://") {
        final_dsn = absolutize_sqlite_dsn(&final_dsn, &base_dir, true)?;
    }

    let mut opts = ConnectOptions::new(final_dsn.clone());
    opts.acquire_timeout(Duration::from_secs(5));
    if final_dsn == "sqlite::memory:" {
        // every pooled connection would otherwise see its own empty database
        opts.max_connections(1);
    } else {
        opts.max_connections(db_config.max_conns.unwrap_or(10));
    }

    tracing::info!("Connecting to {} database: {}", backend, final_dsn);
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to {final_dsn}"))?;
    tracing::info!("Connected DB backend: {:?}", db.get_database_backend());
    Ok(db)
}

async fn open_module(config: &AppConfig, args: &CliArgs) -> Result<AvcForms> {
    let db = connect_db(config, args).await?;
    AvcForms::migrate(&db).await?;
    let module_cfg: AvcFormsConfig = config.module_config(MODULE_NAME)?;
    module_cfg
        .validate()
        .with_context(|| format!("invalid configuration for module '{MODULE_NAME}'"))?;
    Ok(AvcForms::new(db, &module_cfg))
}

fn build_app(module: &AvcForms, config: &AppConfig) -> Result<Router> {
    let prefix = config.server.api_prefix.trim_end_matches('/');
    let openapi = serde_json::to_value(module.openapi(prefix))
        .context("failed to render OpenAPI document")?;

    let public = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .route(
            "/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        );

    let app = if prefix.is_empty() {
        public.merge(module.router())
    } else {
        public.nest(prefix, module.router())
    };

    let app = if config.server.timeout_sec > 0 {
        app.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.timeout_sec),
        ))
    } else {
        app
    };

    Ok(request_id::with_request_tracing(app))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let module = open_module(&config, &args).await?;
    let app = build_app(&module, &config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("AVC Forms Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("failed to listen for SIGTERM: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if let Some(db) = config.database.as_ref() {
        detect_from_dsn(db)?;
    }
    let module_cfg: AvcFormsConfig = config.module_config(MODULE_NAME)?;
    module_cfg
        .validate()
        .with_context(|| format!("invalid configuration for module '{MODULE_NAME}'"))?;

    // AppConfig::load_* already normalized & created home_dir
    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
