use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use filevault::cache::{self, FileCache};
use filevault::file::{FileService, FileStorage, PublicUrls, Sweeper};
use filevault::web::{AppState, WebServer};
use filevault::{Config, Database, TokenIssuer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    let config = if Path::new(CONFIG_PATH).exists() {
        match Config::load_with_env(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {CONFIG_PATH}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    };

    if let Err(e) = filevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filevault::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("filevault stopped: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> filevault::Result<()> {
    config.validate()?;

    info!("filevault starting");

    let db = Database::open(&config.database.url, config.database.max_connections).await?;
    let storage = FileStorage::new(&config.files.upload_dir)?;
    let backend = cache::from_config(&config.cache).await?;
    let file_cache = FileCache::from_config(backend, &config.cache);
    let urls = PublicUrls::new(&config.web.public_base_url, &config.files.public_prefix)?;

    info!(
        upload_dir = %storage.base_path().display(),
        cache_enabled = file_cache.is_enabled(),
        "File storage ready"
    );

    let files = FileService::new(db.pool().clone(), storage.clone(), file_cache.clone(), urls)
        .with_max_file_size(config.files.max_upload_bytes())
        .with_share_requires_owner(config.files.share_requires_owner);

    let sweeper = if config.sweeper.enabled {
        let handle = Sweeper::new(db.pool().clone(), storage, file_cache)
            .with_interval(Duration::from_secs(config.sweeper.interval_secs))
            .spawn();
        info!(interval_secs = config.sweeper.interval_secs, "Sweeper started");
        Some(handle)
    } else {
        warn!("Sweeper disabled; expired files will not be reclaimed");
        None
    };

    let tokens = TokenIssuer::new(
        &config.web.jwt_secret,
        config.web.jwt_access_token_expiry_secs,
    );
    let state = Arc::new(AppState::new(db, files, tokens));
    let server = WebServer::new(&config.web, state, &config.files.public_prefix);

    let served = server.run(shutdown_signal()).await;

    if let Some(handle) = sweeper {
        handle.shutdown().await;
        info!("Sweeper stopped");
    }

    served?;
    info!("filevault stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
