pub mod feature_row;
pub mod window;

pub use feature_row::{FeatureRow, FeatureVector, FEATURE_COLS, FEATURE_DIM};
pub use window::FeatureWindow;
