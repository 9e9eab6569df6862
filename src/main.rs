//! Service binary: wires configuration, store and HTTP server together.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use brewsight::store::{MemoryStore, PgStore, TelemetryStore};
use brewsight::{AppConfig, DashboardService, HttpServer, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "brewsight",
    version,
    about = "Operational telemetry backend for smart cafés"
)]
struct Args {
    /// Listening port (overrides the PORT environment variable)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address, e.g. 0.0.0.0:5000 (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// PostgreSQL connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Directory for attendance photos (overrides PHOTO_DIR)
    #[arg(long)]
    photo_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn build_config(args: &Args) -> brewsight::Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = args.port {
        config.bind_addr.set_port(port);
    }
    if let Some(url) = &args.database_url {
        config.database_url = Some(url.clone());
    }
    if let Some(dir) = &args.photo_dir {
        config.photo_dir = dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    info!(version = VERSION, addr = %config.bind_addr, "starting brewsight");

    let mut pg_handle: Option<PgStore> = None;
    let store: Arc<dyn TelemetryStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await?
                .with_timeout(config.store_timeout);
            pg_handle = Some(store.clone());
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; falling back to the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let service = DashboardService::new(Arc::clone(&store), &config);
    let server = HttpServer::new(service, config.bind_addr);

    tokio::select! {
        result = server.run() => {
            if let Err(err) = result {
                error!(error = %err, "server error");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    if let Some(pg) = pg_handle {
        pg.close().await;
    }

    Ok(())
}
