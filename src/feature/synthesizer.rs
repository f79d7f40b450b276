use crate::feature::engineer::{MA_LONG_HOURS, MA_SHORT_HOURS};
use crate::instrument::Horizon;
use crate::model::feature_row::FeatureRow;
use crate::model::window::FeatureWindow;

/// Which branch produced a derived column: the straight computation or its
/// documented numeric fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Computed,
    Fallback,
}

/// Per-column provenance of a synthesized row, so callers and tests can see
/// exactly which guards fired.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisTrace {
    /// Fallback: linear per-hour rate after a one-step drop past -100%.
    pub hourly_return: Derivation,
    /// Fallback: previous volume was zero.
    pub vol_change: Derivation,
    /// Fallback: degenerate long moving average.
    pub ma_ratio: Derivation,
}

impl SynthesisTrace {
    pub fn any_fallback(&self) -> bool {
        self.hourly_return == Derivation::Fallback
            || self.vol_change == Derivation::Fallback
            || self.ma_ratio == Derivation::Fallback
    }
}

/// Closes of the trailing `span - 1` window rows plus the new close, averaged
/// the way the historical rolling mean would include the row itself.
fn mean_close_with(window: &FeatureWindow, new_close: f64, span: usize) -> f64 {
    let rows = window.rows();
    let from_window = span.saturating_sub(1).min(rows.len());
    let mut sum = new_close;
    for row in &rows[rows.len() - from_window..] {
        sum += row.close;
    }
    sum / (from_window + 1) as f64
}

/// Fabricate the feature row for the next time step from one predicted close.
///
/// Deterministic and pure: reads the window, returns the new row without
/// appending it. The caller owns timestamp advancement via `horizon`.
pub fn synthesize_row(
    window: &FeatureWindow,
    predicted_close: f64,
    horizon: Horizon,
) -> (FeatureRow, SynthesisTrace) {
    let prev = *window.rows().last().expect("synthesize needs history");

    let open_time = prev.open_time + horizon.step();
    let open = prev.close;
    let close = predicted_close;
    let high = open.max(close);
    let low = open.min(close);
    // Future volume is unknowable; carry the last observation.
    let volume = prev.volume;

    let step_return = if prev.close.abs() > f64::EPSILON {
        close / prev.close - 1.0
    } else {
        0.0
    };
    let hours = horizon.hours() as f64;
    let (return_1h, hourly_return) = if horizon.hours() <= 1 {
        (step_return, Derivation::Computed)
    } else if step_return > -1.0 {
        // geometric down-scaling to a per-hour rate
        ((1.0 + step_return).powf(1.0 / hours) - 1.0, Derivation::Computed)
    } else {
        // a drop past -100% in one step has no real per-hour geometric rate
        (step_return / hours, Derivation::Fallback)
    };

    let (vol_change, vol_change_src) = if prev.volume.abs() > f64::EPSILON {
        (volume / prev.volume - 1.0, Derivation::Computed)
    } else {
        (0.0, Derivation::Fallback)
    };

    // Carried unchanged: one step contributes at most one intra-window return
    // sample per 24h of calendar time, far too few to re-estimate the rolling
    // std without injecting noise.
    let volatility_24h = prev.volatility_24h;

    // Keep the calendar span of each average constant across step sizes.
    let span = |window_hours: usize| -> usize {
        ((window_hours as f64 / hours).round() as usize).max(1)
    };
    let ma_24 = mean_close_with(window, close, span(MA_SHORT_HOURS));
    let ma_168 = mean_close_with(window, close, span(MA_LONG_HOURS));
    let (ma_ratio, ma_ratio_src) = if ma_168.abs() > f64::EPSILON {
        (ma_24 / ma_168, Derivation::Computed)
    } else {
        (1.0, Derivation::Fallback)
    };

    let row = FeatureRow {
        open_time,
        open,
        high,
        low,
        close,
        volume,
        missing_flag: 1,
        return_1h,
        volatility_24h,
        ma_24,
        ma_168,
        ma_ratio,
        vol_change,
    };
    let trace = SynthesisTrace {
        hourly_return,
        vol_change: vol_change_src,
        ma_ratio: ma_ratio_src,
    };
    (row, trace)
}
