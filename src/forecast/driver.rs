use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calibrate::estimate_calibration;
use crate::error::ForecastError;
use crate::feature::synthesizer::synthesize_row;
use crate::history::DataSource;
use crate::instrument::{Horizon, Instrument};
use crate::model::feature_row::{FeatureVector, FEATURE_DIM};
use crate::model::window::FeatureWindow;
use crate::model_store::ModelBundle;

/// Observations the regressor consumes per prediction, for every horizon.
pub const SEQ_LEN: usize = 48;

/// Warmup beyond this many autoregressive steps is refused outright; long
/// synthetic chains drift instead of converging.
pub const WARMUP_CAP: u64 = SEQ_LEN as u64;

/// A validated forecast request. Immutable once built.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub instrument: Instrument,
    pub horizon: Horizon,
    pub steps_ahead: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub data_source: DataSource,
}

/// One returned forecast point. Warmup steps are never returned.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ForecastStep {
    pub timestamp: DateTime<Utc>,
    pub predicted_price: f64,
}

/// Driver output: the forecast series plus the anchors a caller needs to
/// audit how the window was advanced.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastOutcome {
    pub base_timestamp: DateTime<Utc>,
    pub base_close: f64,
    pub requested_start: DateTime<Utc>,
    pub steps: Vec<ForecastStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Forecasting,
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Phase::Warmup => "warmup",
            Phase::Forecasting => "forecasting",
        }
    }
}

/// One prediction through the scaler/regressor pipeline: scale the window,
/// predict, clip to the price scaler's fitted output range, map back to
/// price units. Calibration is applied by the caller.
pub fn predict_close(
    bundle: &ModelBundle,
    features: &[FeatureVector],
) -> Result<f64, ForecastError> {
    let scaled = bundle.feature_scaler.transform_rows(features);
    let raw = bundle.regressor.predict(&scaled)?;
    // The inverse transform is only meaningful inside the fitted range.
    let (lo, hi) = bundle.price_scaler.feature_range();
    Ok(bundle.price_scaler.inverse_scalar(raw.clamp(lo, hi)))
}

/// Synthetic steps needed to advance the window's end to the requested start.
/// Zero when the start is not in the future of the base row.
pub fn warmup_steps(base: DateTime<Utc>, start: DateTime<Utc>, horizon: Horizon) -> u64 {
    if start <= base {
        return 0;
    }
    let step_secs = horizon.step().num_seconds();
    let delta_secs = (start - base).num_seconds();
    let steps = (delta_secs + step_secs - 1) / step_secs;
    (steps - 1).max(0) as u64
}

/// Advance a privately-owned window through `warmup + steps_ahead`
/// autoregressive steps and collect the forecast points.
///
/// `now` is injected so replays and tests are reproducible; it only matters
/// for live requests without an explicit start time.
pub fn run_forecast(
    mut window: FeatureWindow,
    bundle: &ModelBundle,
    request: &ForecastRequest,
    now: DateTime<Utc>,
) -> Result<ForecastOutcome, ForecastError> {
    if request.steps_ahead < 1 {
        return Err(ForecastError::InvalidStepCount(request.steps_ahead));
    }
    if window.len() < SEQ_LEN {
        return Err(ForecastError::InsufficientHistory {
            instrument: request.instrument.id().to_string(),
            have: window.len(),
            need: SEQ_LEN,
        });
    }
    let expected = bundle.feature_scaler.n_features();
    if expected != FEATURE_DIM {
        return Err(ForecastError::FeatureScalerMismatch {
            expected,
            actual: FEATURE_DIM,
        });
    }

    let base = window.rows()[window.len() - 1];
    let base_timestamp = base.open_time;
    let base_close = base.close;

    // Fixed once per request; every step reuses the same correction.
    let calibration = estimate_calibration(&window, bundle, SEQ_LEN)?;

    let start = request.start_time.unwrap_or(match request.data_source {
        DataSource::Live => now,
        // A stale static dataset's "now" can be arbitrarily far in the past;
        // anchoring to the base row prevents runaway warmup.
        DataSource::Stored => base_timestamp,
    });

    let warmup = warmup_steps(base_timestamp, start, request.horizon);
    if warmup > WARMUP_CAP {
        return Err(ForecastError::ExcessiveWarmup {
            instrument: request.instrument.id().to_string(),
            computed: warmup,
            cap: WARMUP_CAP,
        });
    }

    tracing::debug!(
        instrument = %request.instrument,
        horizon = %request.horizon,
        warmup,
        steps_ahead = request.steps_ahead,
        ratio = calibration.ratio,
        basis = ?calibration.basis,
        "forecast loop starting"
    );

    let total = warmup + u64::from(request.steps_ahead);
    let mut steps = Vec::with_capacity(request.steps_ahead as usize);
    for i in 0..total {
        let phase = if i < warmup {
            Phase::Warmup
        } else {
            Phase::Forecasting
        };

        let features = window.tail_features(SEQ_LEN);
        let predicted = predict_close(bundle, &features)? * calibration.ratio;
        let (row, trace) = synthesize_row(&window, predicted, request.horizon);
        if trace.any_fallback() {
            tracing::debug!(step = i + 1, ?trace, "synthesis fallback applied");
        }
        tracing::trace!(
            step = i + 1,
            phase = phase.label(),
            timestamp = %row.open_time,
            predicted,
            "autoregressive step"
        );
        window.push(row);

        if phase == Phase::Forecasting {
            steps.push(ForecastStep {
                timestamp: row.open_time,
                predicted_price: predicted,
            });
        }
    }

    tracing::info!(
        instrument = %request.instrument,
        horizon = %request.horizon,
        warmup,
        steps = steps.len(),
        "forecast complete"
    );

    Ok(ForecastOutcome {
        base_timestamp,
        base_close,
        requested_start: start,
        steps,
    })
}
