/// Post-hoc comparison of a forecast against later-observed prices.
///
/// Fetching the actual prices and persisting verification results are a
/// collaborator's job; this module only does the arithmetic.
#[derive(Debug, Clone, Default)]
pub struct ErrorMetrics {
    /// Absolute percentage error per step; `None` where no sample exists.
    pub errors_pct: Vec<Option<f64>>,
    pub mean_error_pct: Option<f64>,
    pub max_error_pct: Option<f64>,
}

/// Absolute percentage error of each predicted price against the observed
/// one. Steps with no observation or a zero prediction contribute no sample.
pub fn error_metrics(predicted: &[f64], actual: &[Option<f64>]) -> ErrorMetrics {
    let errors_pct: Vec<Option<f64>> = predicted
        .iter()
        .zip(actual)
        .map(|(pred, act)| match act {
            Some(act) if pred.abs() > f64::EPSILON => {
                Some(((act - pred) / pred).abs() * 100.0)
            }
            _ => None,
        })
        .collect();

    let valid: Vec<f64> = errors_pct.iter().flatten().copied().collect();
    if valid.is_empty() {
        return ErrorMetrics {
            errors_pct,
            mean_error_pct: None,
            max_error_pct: None,
        };
    }

    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    let max = valid.iter().cloned().fold(f64::MIN, f64::max);
    ErrorMetrics {
        errors_pct,
        mean_error_pct: Some(mean),
        max_error_pct: Some(max),
    }
}
