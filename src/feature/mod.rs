pub mod engineer;
pub mod rolling;
pub mod synthesizer;

pub use engineer::{engineer_features, fill_hourly_gaps, RawCandle};
pub use synthesizer::{synthesize_row, Derivation, SynthesisTrace};
