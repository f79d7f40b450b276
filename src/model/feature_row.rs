use chrono::{DateTime, Utc};

/// Model input width: every feature column except `close`, which is the
/// prediction target.
pub const FEATURE_DIM: usize = 11;

/// Column order the feature scaler and the regressor were fitted against.
pub const FEATURE_COLS: [&str; FEATURE_DIM] = [
    "open",
    "high",
    "low",
    "volume",
    "return_1h",
    "volatility_24h",
    "ma_24",
    "ma_168",
    "ma_ratio",
    "vol_change",
    "missing_flag",
];

pub type FeatureVector = [f64; FEATURE_DIM];

/// One observation (or one synthesized step) of the processed feature series.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRow {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// 1 for gap-filled observations and for synthesized future rows.
    pub missing_flag: u8,
    pub return_1h: f64,
    pub volatility_24h: f64,
    pub ma_24: f64,
    pub ma_168: f64,
    pub ma_ratio: f64,
    pub vol_change: f64,
}

impl FeatureRow {
    /// Model-facing vector in fitted column order. `close` is excluded.
    pub fn features(&self) -> FeatureVector {
        [
            self.open,
            self.high,
            self.low,
            self.volume,
            self.return_1h,
            self.volatility_24h,
            self.ma_24,
            self.ma_168,
            self.ma_ratio,
            self.vol_change,
            self.missing_flag as f64,
        ]
    }

    /// OHLC consistency: the traded range brackets both open and close.
    pub fn price_bounds_hold(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }

    pub fn all_finite(&self) -> bool {
        self.features().iter().all(|v| v.is_finite()) && self.close.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> FeatureRow {
        FeatureRow {
            open_time: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 99.0,
            close: 104.0,
            volume: 12.5,
            missing_flag: 0,
            return_1h: 0.04,
            volatility_24h: 0.01,
            ma_24: 101.0,
            ma_168: 98.0,
            ma_ratio: 101.0 / 98.0,
            vol_change: 0.2,
        }
    }

    #[test]
    fn feature_vector_matches_column_order() {
        let f = row().features();
        assert_eq!(f.len(), FEATURE_COLS.len());
        assert!((f[0] - 100.0).abs() < f64::EPSILON); // open
        assert!((f[3] - 12.5).abs() < f64::EPSILON); // volume
        assert!((f[10] - 0.0).abs() < f64::EPSILON); // missing_flag
        // close is not a feature
        assert!(!f.contains(&104.0));
    }

    #[test]
    fn price_bounds() {
        assert!(row().price_bounds_hold());
        let mut bad = row();
        bad.high = 103.0;
        assert!(!bad.price_bounds_hold());
    }
}
