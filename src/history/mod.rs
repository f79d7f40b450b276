pub mod live;
pub mod stored;

use serde::{Deserialize, Serialize};

/// Where a request's base window comes from. Both sources produce the same
/// `FeatureRow` shape; the core treats them identically past this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The persisted processed-feature table.
    #[default]
    Stored,
    /// A fresh fetch from the exchange, feature-engineered on the fly.
    Live,
}
