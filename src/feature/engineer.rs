use chrono::{DateTime, Duration, Utc};

use crate::feature::rolling::{RollingMean, RollingStd};
use crate::model::feature_row::FeatureRow;

/// Raw exchange bar before feature engineering.
#[derive(Debug, Clone, Copy)]
pub struct RawCandle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

pub const MA_SHORT_HOURS: usize = 24;
pub const MA_LONG_HOURS: usize = 168;
pub const VOLATILITY_WINDOW_HOURS: usize = 24;

/// Extreme volume swings are clipped so one burst cannot blow out the
/// scaler's fitted range.
pub const VOL_CHANGE_CLIP: f64 = 10.0;

fn align_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let secs = t.timestamp();
    chrono::TimeZone::timestamp_opt(&Utc, secs - secs.rem_euclid(3600), 0)
        .single()
        .unwrap_or(t)
}

/// Reindex candles onto a strict hourly grid between the first and last
/// observed bar. Bars are aligned to their hour bucket; duplicates and time
/// regressions are dropped; gap hours repeat the previous candle's values
/// with the missing flag raised.
pub fn fill_hourly_gaps(candles: &[RawCandle]) -> Vec<(RawCandle, bool)> {
    let mut ordered: Vec<RawCandle> = Vec::with_capacity(candles.len());
    for c in candles {
        let mut c = *c;
        c.open_time = align_to_hour(c.open_time);
        let regression = matches!(ordered.last(), Some(last) if c.open_time <= last.open_time);
        if !regression {
            ordered.push(c);
        }
    }
    let Some(first) = ordered.first().copied() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(ordered.len());
    let mut cursor = first.open_time;
    let mut idx = 0usize;
    let mut prev = first;
    while idx < ordered.len() {
        let candle = ordered[idx];
        if candle.open_time == cursor {
            out.push((candle, false));
            prev = candle;
            idx += 1;
        } else {
            // gap hour: carry the previous bar forward
            let mut filler = prev;
            filler.open_time = cursor;
            out.push((filler, true));
        }
        cursor = cursor + Duration::hours(1);
    }
    out
}

/// Build feature rows the same way the training data was preprocessed, so a
/// freshly fetched window is distributionally consistent with the model.
pub fn engineer_features(candles: &[RawCandle]) -> Vec<FeatureRow> {
    let filled = fill_hourly_gaps(candles);

    let mut ma_short = RollingMean::new(MA_SHORT_HOURS);
    let mut ma_long = RollingMean::new(MA_LONG_HOURS);
    let mut vol_std = RollingStd::new(VOLATILITY_WINDOW_HOURS);

    let mut rows = Vec::with_capacity(filled.len());
    let mut prev: Option<RawCandle> = None;
    for (candle, was_gap) in &filled {
        let return_1h = match prev {
            Some(p) if p.close.abs() > f64::EPSILON => candle.close / p.close - 1.0,
            _ => 0.0,
        };
        let vol_change = match prev {
            Some(p) if p.volume.abs() > f64::EPSILON => {
                (candle.volume / p.volume - 1.0).clamp(-VOL_CHANGE_CLIP, VOL_CHANGE_CLIP)
            }
            _ => 0.0,
        };

        let volatility_24h = vol_std.push(return_1h);
        let ma_24 = ma_short.push(candle.close);
        let ma_168 = ma_long.push(candle.close);
        let ma_ratio = if ma_168.abs() > f64::EPSILON {
            ma_24 / ma_168
        } else {
            1.0
        };

        rows.push(FeatureRow {
            open_time: candle.open_time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            missing_flag: u8::from(*was_gap),
            return_1h,
            volatility_24h,
            ma_24,
            ma_168,
            ma_ratio,
            vol_change,
        });
        prev = Some(*candle);
    }
    rows
}
