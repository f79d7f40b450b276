use crate::error::ForecastError;
use crate::model::feature_row::{FeatureRow, FeatureVector};

/// Append-only, strictly time-ordered sequence of feature rows.
///
/// Each forecast invocation owns its window outright; rows are never edited
/// in place, so everything computed from earlier rows stays reproducible.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    rows: Vec<FeatureRow>,
}

impl FeatureWindow {
    /// Build a window from provider output, validating ordering and
    /// finiteness at the trust boundary.
    pub fn from_rows(rows: Vec<FeatureRow>) -> Result<Self, ForecastError> {
        for (i, row) in rows.iter().enumerate() {
            if !row.all_finite() {
                return Err(ForecastError::upstream(
                    "history",
                    format!("non-finite value in row {} at {}", i, row.open_time),
                ));
            }
            if i > 0 && row.open_time <= rows[i - 1].open_time {
                return Err(ForecastError::upstream(
                    "history",
                    format!("timestamps not strictly increasing at row {}", i),
                ));
            }
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Append one row. The driver only ever moves forward in time.
    pub fn push(&mut self, row: FeatureRow) {
        if let Some(prev) = self.rows.last() {
            assert!(
                row.open_time > prev.open_time,
                "window append must advance time"
            );
        }
        self.rows.push(row);
    }

    /// Feature vectors of the trailing `n` rows, oldest first.
    pub fn tail_features(&self, n: usize) -> Vec<FeatureVector> {
        self.features_ending_at(self.rows.len(), n)
    }

    /// Feature vectors of the `n` rows ending just before index `end`
    /// (exclusive), oldest first.
    pub fn features_ending_at(&self, end: usize, n: usize) -> Vec<FeatureVector> {
        assert!(end <= self.rows.len(), "slice end out of bounds");
        assert!(n <= end, "slice longer than available rows");
        self.rows[end - n..end].iter().map(|r| r.features()).collect()
    }
}
