use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use clinic_server::{create_app, services::google::spawn_calendar_poller, AppConfig, AppState};
use database_layer::DatabasePool;

/// Clinic records HTTP server
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "Clinic records API with Google Calendar sync")]
struct Args {
    /// Server bind address (overrides HOST from the configuration)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Server port (overrides PORT from the configuration)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, env = "CLINIC_CONFIG", default_value = "clinic-server.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, env = "VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(args.verbose, config.is_production());

    info!(version = env!("CARGO_PKG_VERSION"), env = %config.app_env, "Starting clinic server");

    let database = DatabasePool::connect(&config.database_config()?)
        .await
        .context("Failed to connect to the database")?;
    database.migrate().await.context("Failed to run migrations")?;
    info!("Database ready");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;
    let poll_interval = config.calendar_sync_interval();
    let swagger = config.enable_swagger;

    let state = AppState::new(config, database.pool().clone())?;

    if let Some(google) = &state.google {
        spawn_calendar_poller(google.sync.clone(), poll_interval);
    }

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Clinic server running on http://{}", addr);
    info!("Health check available at: http://{}/health", addr);
    if swagger {
        info!("API documentation at: http://{}/docs", addr);
    }

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}

fn init_tracing(verbose: bool, production: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("clinic_server={},tower_http=info,sqlx=warn", level).into()
    });

    if production {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .init();
    }
}
