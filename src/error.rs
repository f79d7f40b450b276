use thiserror::Error;

/// Request-rejection and upstream-failure taxonomy for the forecast core.
///
/// Numeric edge cases inside feature synthesis and calibration are handled by
/// documented fallback values and never surface here.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("unsupported instrument '{0}'")]
    UnsupportedInstrument(String),

    #[error("unsupported horizon '{0}' (supported: 1h, 24h)")]
    UnsupportedHorizon(String),

    #[error("steps_ahead must be at least 1, got {0}")]
    InvalidStepCount(u32),

    #[error("insufficient history for {instrument}: {have} rows, need {need}")]
    InsufficientHistory {
        instrument: String,
        have: usize,
        need: usize,
    },

    #[error("feature scaler expects {expected} features, rows carry {actual}")]
    FeatureScalerMismatch { expected: usize, actual: usize },

    #[error("start time for {instrument} needs {computed} warmup steps, cap is {cap}")]
    ExcessiveWarmup {
        instrument: String,
        computed: u64,
        cap: u64,
    },

    #[error("{component} unavailable: {reason}")]
    UpstreamUnavailable {
        component: &'static str,
        reason: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    pub fn upstream(component: &'static str, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            component,
            reason: reason.into(),
        }
    }
}
