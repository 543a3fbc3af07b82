use std::path::PathBuf;
use std::sync::Arc;

use cambio::config::{Cli, Config, MEMORY_DATABASE, default_config_dir, default_config_path};
use cambio::db::Database;
use cambio::handler::AppState;
use cambio::store::{ConversionStore, MemoryStore};
use cambio::unpack_error;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Config and data directory. An explicit `--config` must exist and its
/// parent holds the data. Otherwise `~/.cambio/` is used, falling back to
/// defaults when it has no config file.
fn load_config(args: &Cli) -> anyhow::Result<(Config, PathBuf)> {
    match &args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((Config::new(&path.to_string_lossy())?, dir))
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                Ok((Config::new(&path.to_string_lossy())?, default_config_dir()))
            } else {
                tracing::warn!(path = ?path, "no config file found, using defaults");
                Ok((Config::default(), default_config_dir()))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("cambio.svc starting");

    let (cfg, data_dir) = load_config(&args).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&*e), "failed to load config file");
        std::process::exit(1);
    });

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let cancellation_token = CancellationToken::new();

    let mut database: Option<Arc<Database>> = None;
    let store: Arc<dyn ConversionStore> = if cfg.app.get_db() == MEMORY_DATABASE {
        tracing::info!("[db] using in-memory store, records are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
            tracing::error!(error = %unpack_error(&*e), "failed to setup database");
            std::process::exit(1);
        }));
        database = Some(db.clone());
        db
    };

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let app = cambio::router(AppState::new(store, &cfg.validation.required_fields));

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("ctrl+c signal received, preparing to shutdown");
                shutdown_token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl+c"),
        }
    });

    tracing::info!("cambio.svc running on {}", &address);
    let server = axum::serve(listener, app).with_graceful_shutdown(cancellation_token.clone().cancelled_owned());
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }

    if let Some(db) = database.filter(|db| db.is_replica()) {
        if let Err(e) = db.sync().await {
            tracing::warn!(error = %unpack_error(&*e), "failed to flush replica before exit");
        }
    }

    tracing::info!("cambio.svc going off, graceful shutdown complete");
}
