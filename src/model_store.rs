use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::ForecastError;
use crate::instrument::{Horizon, Instrument};
use crate::regressor::{OnnxRegressor, SequenceRegressor};
use crate::scaler::MinMaxScaler;

/// One trained model plus its scaler pair per instrument and horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub instrument: Instrument,
    pub horizon: Horizon,
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.instrument, self.horizon)
    }
}

/// Everything one forecast needs from the training side. Shared read-only
/// across concurrent requests once loaded.
pub struct ModelBundle {
    pub regressor: Arc<dyn SequenceRegressor>,
    pub feature_scaler: MinMaxScaler,
    pub price_scaler: MinMaxScaler,
}

/// Source of truth the store consults on first access per key.
pub trait ModelSource: Send + Sync {
    fn load(&self, key: &ModelKey) -> Result<ModelBundle, ForecastError>;
}

/// Filesystem layout produced by the training/export pipeline:
/// `<model_dir>/<coin>/<horizon>/final_lstm_<coin>_<horizon>.onnx` and
/// `<data_dir>/scaled/<coin>/<coin>_{feature,price}_scaler.json`.
pub struct FsModelSource {
    model_dir: PathBuf,
    data_dir: PathBuf,
}

impl FsModelSource {
    pub fn new(model_dir: &Path, data_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    fn require(path: PathBuf, what: &'static str) -> Result<PathBuf, ForecastError> {
        if path.exists() {
            Ok(path)
        } else {
            Err(ForecastError::upstream(
                what,
                format!("not found: {}", path.display()),
            ))
        }
    }
}

impl ModelSource for FsModelSource {
    fn load(&self, key: &ModelKey) -> Result<ModelBundle, ForecastError> {
        let coin = key.instrument.id();
        let horizon = key.horizon.label();

        let model_path = Self::require(
            self.model_dir
                .join(coin)
                .join(horizon)
                .join(format!("final_lstm_{coin}_{horizon}.onnx")),
            "regressor",
        )?;
        let scaled_dir = self.data_dir.join("scaled").join(coin);
        let feature_path = Self::require(
            scaled_dir.join(format!("{coin}_feature_scaler.json")),
            "scaler",
        )?;
        let price_path = Self::require(
            scaled_dir.join(format!("{coin}_price_scaler.json")),
            "scaler",
        )?;

        let regressor = OnnxRegressor::load(&model_path)?;
        let feature_scaler = MinMaxScaler::load(&feature_path)?;
        let price_scaler = MinMaxScaler::load(&price_path)?;

        Ok(ModelBundle {
            regressor: Arc::new(regressor),
            feature_scaler,
            price_scaler,
        })
    }
}

/// Process-wide bundle cache with single-flight loads.
///
/// Concurrent first callers for a key await one shared load; a failed load
/// leaves the cell empty so a later request can retry.
pub struct ModelStore<S: ModelSource> {
    source: S,
    cells: Mutex<HashMap<ModelKey, Arc<OnceCell<Arc<ModelBundle>>>>>,
}

impl<S: ModelSource> ModelStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: ModelKey) -> Result<Arc<ModelBundle>, ForecastError> {
        let cell = {
            let mut cells = self.cells.lock().unwrap();
            cells.entry(key).or_default().clone()
        };
        let bundle = cell
            .get_or_try_init(|| async {
                tracing::info!(model = %key, "loading model bundle");
                self.source.load(&key).map(Arc::new)
            })
            .await?;
        Ok(bundle.clone())
    }
}
