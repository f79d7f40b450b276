#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crypto_forecast::error::ForecastError;
use crypto_forecast::history::DataSource;
use crypto_forecast::instrument::{Horizon, Instrument};
use crypto_forecast::model::feature_row::{FeatureRow, FeatureVector, FEATURE_DIM};
use crypto_forecast::model::window::FeatureWindow;
use crypto_forecast::model_store::ModelBundle;
use crypto_forecast::forecast::driver::ForecastRequest;
use crypto_forecast::regressor::SequenceRegressor;
use crypto_forecast::scaler::{MinMaxScaler, ScalerParams};

/// Test price scaler maps [0, 200] <-> [0, 1].
pub const PRICE_MAX: f64 = 200.0;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

pub fn row_at(ts: DateTime<Utc>, close: f64, volume: f64) -> FeatureRow {
    FeatureRow {
        open_time: ts,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        missing_flag: 0,
        return_1h: 0.0,
        volatility_24h: 0.02,
        ma_24: close,
        ma_168: close,
        ma_ratio: 1.0,
        vol_change: 0.0,
    }
}

/// `n` hourly rows ending at `t0 + (n-1)h`, all with the same close.
pub fn hourly_window(n: usize, close: f64) -> FeatureWindow {
    let rows: Vec<FeatureRow> = (0..n)
        .map(|i| row_at(t0() + Duration::hours(i as i64), close, 10.0))
        .collect();
    FeatureWindow::from_rows(rows).unwrap()
}

/// Regressor stub returning one constant scaled value.
pub struct FixedRegressor(pub f64);

impl SequenceRegressor for FixedRegressor {
    fn predict(&self, _window: &[FeatureVector]) -> Result<f64, ForecastError> {
        Ok(self.0)
    }
}

/// Regressor stub whose output follows the last row's open, so the
/// autoregressive feedback is visible in the series.
pub struct TrendRegressor {
    pub gain: f64,
}

impl SequenceRegressor for TrendRegressor {
    fn predict(&self, window: &[FeatureVector]) -> Result<f64, ForecastError> {
        let last_open = window.last().map(|r| r[0]).unwrap_or(0.0);
        Ok(last_open * self.gain / PRICE_MAX)
    }
}

pub fn identity_feature_scaler(width: usize) -> MinMaxScaler {
    MinMaxScaler::from_params(ScalerParams {
        data_min: vec![0.0; width],
        data_max: vec![1.0; width],
        feature_range: (0.0, 1.0),
    })
    .unwrap()
}

pub fn test_price_scaler() -> MinMaxScaler {
    MinMaxScaler::from_params(ScalerParams {
        data_min: vec![0.0],
        data_max: vec![PRICE_MAX],
        feature_range: (0.0, 1.0),
    })
    .unwrap()
}

pub fn bundle(regressor: Arc<dyn SequenceRegressor>) -> ModelBundle {
    bundle_with_feature_width(regressor, FEATURE_DIM)
}

pub fn bundle_with_feature_width(
    regressor: Arc<dyn SequenceRegressor>,
    width: usize,
) -> ModelBundle {
    ModelBundle {
        regressor,
        feature_scaler: identity_feature_scaler(width),
        price_scaler: test_price_scaler(),
    }
}

pub fn request(
    horizon: Horizon,
    steps_ahead: u32,
    start_time: Option<DateTime<Utc>>,
    data_source: DataSource,
) -> ForecastRequest {
    ForecastRequest {
        instrument: Instrument::Bitcoin,
        horizon,
        steps_ahead,
        start_time,
        data_source,
    }
}
