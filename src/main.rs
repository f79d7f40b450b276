use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crypto_forecast::api;
use crypto_forecast::config::Config;
use crypto_forecast::forecast::service::Forecaster;
use crypto_forecast::history::live::LiveHistory;
use crypto_forecast::history::stored::StoredHistory;
use crypto_forecast::model_store::{FsModelSource, ModelStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            config
                .logging
                .level
                .parse()
                .unwrap_or_else(|_| "info".parse().unwrap())
        }))
        .json()
        .init();

    tracing::info!(
        bind = %config.service.bind_addr,
        model_dir = %config.paths.model_dir.display(),
        history_db = %config.paths.history_db.display(),
        "starting crypto-forecast"
    );

    let store = ModelStore::new(FsModelSource::new(
        &config.paths.model_dir,
        &config.paths.data_dir,
    ));
    let stored = StoredHistory::open(&config.paths.history_db)
        .context("opening processed-feature database")?;
    let live = LiveHistory::new(
        &config.binance.rest_base_url,
        config.binance.live_lookback_hours,
    );
    let service = Arc::new(Forecaster::new(store, stored, live));

    let app = api::router(service);
    let addr: SocketAddr = config
        .service
        .bind_addr
        .parse()
        .context("invalid service.bind_addr")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;

    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
