use crate::error::ForecastError;
use crate::forecast::driver::predict_close;
use crate::model::window::FeatureWindow;
use crate::model_store::ModelBundle;

/// Bounds on the multiplicative correction. One bad retrodiction must not
/// amplify into an extreme multiplier across every future step.
pub const CALIBRATION_MIN: f64 = 0.8;
pub const CALIBRATION_MAX: f64 = 1.2;

/// How the ratio was obtained. The fallback variants apply no correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationBasis {
    /// One-step retrodiction of the last observed close succeeded.
    Retrodiction { predicted_now: f64 },
    /// Window shorter than `seq_len + 1`: nothing to retrodict against.
    WindowTooShort,
    /// Retrodiction came back non-positive; a ratio would be meaningless.
    NonPositiveRetrodiction { predicted_now: f64 },
}

/// The constant correction applied to every step of one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub ratio: f64,
    pub basis: CalibrationBasis,
}

/// Measure the regressor's one-step retrodiction bias against the last
/// observed close and derive the bounded correction.
///
/// The retrodiction window ends one row before the last observation and runs
/// through the exact pipeline a forecast step uses, so the measured bias is
/// the bias the forecast steps will carry.
pub fn estimate_calibration(
    window: &FeatureWindow,
    bundle: &ModelBundle,
    seq_len: usize,
) -> Result<Calibration, ForecastError> {
    let n = window.len();
    if n < seq_len + 1 {
        return Ok(Calibration {
            ratio: 1.0,
            basis: CalibrationBasis::WindowTooShort,
        });
    }

    let features = window.features_ending_at(n - 1, seq_len);
    let predicted_now = predict_close(bundle, &features)?;
    let actual_now = window.rows()[n - 1].close;

    if predicted_now > 0.0 {
        let ratio = (actual_now / predicted_now).clamp(CALIBRATION_MIN, CALIBRATION_MAX);
        tracing::debug!(predicted_now, actual_now, ratio, "calibration from retrodiction");
        Ok(Calibration {
            ratio,
            basis: CalibrationBasis::Retrodiction { predicted_now },
        })
    } else {
        tracing::debug!(predicted_now, "retrodiction degenerate, no correction");
        Ok(Calibration {
            ratio: 1.0,
            basis: CalibrationBasis::NonPositiveRetrodiction { predicted_now },
        })
    }
}
