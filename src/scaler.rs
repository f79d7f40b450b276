use std::path::Path;

use serde::Deserialize;

use crate::error::ForecastError;
use crate::model::feature_row::FeatureVector;

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Fitted min-max parameters as exported by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerParams {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

/// Min-max scaler mirroring the transform the model was trained against.
///
/// Columns map `[data_min, data_max] -> [range.0, range.1]`; a degenerate
/// column (max == min) maps to the range floor and inverts back to the
/// fitted minimum.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
    range: (f64, f64),
}

impl MinMaxScaler {
    pub fn from_params(params: ScalerParams) -> Result<Self, ForecastError> {
        if params.data_min.len() != params.data_max.len() || params.data_min.is_empty() {
            return Err(ForecastError::upstream(
                "scaler",
                format!(
                    "fitted bounds disagree: {} mins vs {} maxes",
                    params.data_min.len(),
                    params.data_max.len()
                ),
            ));
        }
        if params.feature_range.1 <= params.feature_range.0 {
            return Err(ForecastError::upstream(
                "scaler",
                format!("empty feature range {:?}", params.feature_range),
            ));
        }
        for (i, (lo, hi)) in params.data_min.iter().zip(&params.data_max).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || hi < lo {
                return Err(ForecastError::upstream(
                    "scaler",
                    format!("invalid fitted bounds [{lo}, {hi}] for column {i}"),
                ));
            }
        }
        Ok(Self {
            data_min: params.data_min,
            data_max: params.data_max,
            range: params.feature_range,
        })
    }

    /// Load a JSON parameter export from disk.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::upstream("scaler", format!("reading {}: {e}", path.display()))
        })?;
        let params: ScalerParams = serde_json::from_str(&text).map_err(|e| {
            ForecastError::upstream("scaler", format!("parsing {}: {e}", path.display()))
        })?;
        Self::from_params(params)
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.range
    }

    fn scale_col(&self, col: usize, value: f64) -> f64 {
        let (lo, hi) = (self.data_min[col], self.data_max[col]);
        let span = hi - lo;
        let unit = if span.abs() > f64::EPSILON {
            (value - lo) / span
        } else {
            0.0
        };
        self.range.0 + unit * (self.range.1 - self.range.0)
    }

    fn unscale_col(&self, col: usize, value: f64) -> f64 {
        let (lo, hi) = (self.data_min[col], self.data_max[col]);
        let unit = (value - self.range.0) / (self.range.1 - self.range.0);
        lo + unit * (hi - lo)
    }

    /// Scale a fixed-width feature matrix, oldest row first.
    pub fn transform_rows(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        assert_eq!(
            self.n_features(),
            rows.first().map(|r| r.len()).unwrap_or(self.n_features()),
            "scaler width must match feature width"
        );
        rows.iter()
            .map(|row| {
                let mut out = *row;
                for (col, v) in out.iter_mut().enumerate() {
                    *v = self.scale_col(col, *v);
                }
                out
            })
            .collect()
    }

    /// Scale a single value through a one-column scaler (the price scaler).
    pub fn transform_scalar(&self, value: f64) -> f64 {
        assert_eq!(self.n_features(), 1, "scalar transform needs one column");
        self.scale_col(0, value)
    }

    /// Map a scaled value back to original units through a one-column scaler.
    pub fn inverse_scalar(&self, value: f64) -> f64 {
        assert_eq!(self.n_features(), 1, "scalar inverse needs one column");
        self.unscale_col(0, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_scaler(lo: f64, hi: f64) -> MinMaxScaler {
        MinMaxScaler::from_params(ScalerParams {
            data_min: vec![lo],
            data_max: vec![hi],
            feature_range: (0.0, 1.0),
        })
        .unwrap()
    }

    #[test]
    fn scales_into_feature_range() {
        let s = price_scaler(100.0, 200.0);
        assert!((s.transform_scalar(100.0) - 0.0).abs() < 1e-12);
        assert!((s.transform_scalar(200.0) - 1.0).abs() < 1e-12);
        assert!((s.transform_scalar(150.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn inverse_undoes_transform() {
        let s = price_scaler(2_000.0, 75_000.0);
        let v = 41_337.5;
        assert!((s.inverse_scalar(s.transform_scalar(v)) - v).abs() < 1e-6);
    }

    #[test]
    fn degenerate_column_maps_to_floor() {
        let s = price_scaler(50.0, 50.0);
        assert!((s.transform_scalar(50.0) - 0.0).abs() < 1e-12);
        assert!((s.inverse_scalar(0.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_bounds_are_rejected() {
        let err = MinMaxScaler::from_params(ScalerParams {
            data_min: vec![0.0, 1.0],
            data_max: vec![1.0],
            feature_range: (0.0, 1.0),
        })
        .unwrap_err();
        assert!(matches!(err, ForecastError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(MinMaxScaler::from_params(ScalerParams {
            data_min: vec![10.0],
            data_max: vec![5.0],
            feature_range: (0.0, 1.0),
        })
        .is_err());
    }
}
