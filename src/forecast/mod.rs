pub mod driver;
pub mod service;

pub use driver::{
    predict_close, run_forecast, warmup_steps, ForecastOutcome, ForecastRequest, ForecastStep,
    SEQ_LEN, WARMUP_CAP,
};
pub use service::Forecaster;
