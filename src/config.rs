use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::feature::engineer::MA_LONG_HOURS;
use crate::forecast::driver::SEQ_LEN;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub paths: PathsConfig,
    pub binance: BinanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root of the exported model tree (`<coin>/<horizon>/final_lstm_*.onnx`).
    pub model_dir: PathBuf,
    /// Root of the data tree holding `scaled/<coin>/*_scaler.json`.
    pub data_dir: PathBuf,
    /// Processed-feature SQLite database.
    pub history_db: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    /// Hours of raw klines fetched for a live window. Must cover the model
    /// sequence plus the longest moving-average span so the engineered tail
    /// rows carry fully warmed indicators.
    pub live_lookback_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("CRYPTO_FORECAST_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let min_lookback = (SEQ_LEN + MA_LONG_HOURS) as u32;
        if self.binance.live_lookback_hours < min_lookback {
            bail!(
                "binance.live_lookback_hours = {} is too small: need at least {} \
                 (model sequence plus longest moving average)",
                self.binance.live_lookback_hours,
                min_lookback
            );
        }
        if self.service.bind_addr.trim().is_empty() {
            bail!("service.bind_addr must not be empty");
        }
        Ok(())
    }
}
