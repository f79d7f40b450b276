mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{
    bundle, bundle_with_feature_width, hourly_window, request, t0, FixedRegressor, TrendRegressor,
    PRICE_MAX,
};
use crypto_forecast::error::ForecastError;
use crypto_forecast::forecast::driver::{run_forecast, SEQ_LEN, WARMUP_CAP};
use crypto_forecast::history::DataSource;
use crypto_forecast::instrument::Horizon;

#[test]
fn static_source_without_start_emits_steps_right_after_base() {
    // base window of 48 hourly rows ending at T0+47h with close 100
    let window = hourly_window(SEQ_LEN, 100.0);
    let base_ts = window.last().unwrap().open_time;
    let b = bundle(Arc::new(FixedRegressor(100.0 / PRICE_MAX)));
    let req = request(Horizon::OneHour, 3, None, DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();

    assert_eq!(outcome.base_timestamp, base_ts);
    assert!((outcome.base_close - 100.0).abs() < f64::EPSILON);
    assert_eq!(outcome.requested_start, base_ts);
    assert_eq!(outcome.steps.len(), 3);
    for (i, step) in outcome.steps.iter().enumerate() {
        assert_eq!(step.timestamp, base_ts + Duration::hours(i as i64 + 1));
        // window too short to calibrate, so raw retrodiction passes through
        assert!((step.predicted_price - 100.0).abs() < 1e-9);
    }
}

#[test]
fn consecutive_steps_are_spaced_one_horizon_apart() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneDay, 4, None, DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();

    assert_eq!(outcome.steps.len(), 4);
    for pair in outcome.steps.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::hours(24));
    }
}

#[test]
fn calibration_is_applied_uniformly() {
    // retrodiction 100 vs observed 105 -> every step multiplied by 1.05
    let window = hourly_window(SEQ_LEN + 1, 105.0);
    let b = bundle(Arc::new(FixedRegressor(100.0 / PRICE_MAX)));
    let req = request(Horizon::OneHour, 5, None, DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();
    for step in &outcome.steps {
        assert!((step.predicted_price - 105.0).abs() < 1e-9);
    }
}

#[test]
fn warmup_steps_are_not_returned() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let base_ts = window.last().unwrap().open_time;
    let start = base_ts + Duration::hours(3);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 2, Some(start), DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();

    // two warmup steps advance the window; the first returned step lands on
    // the requested start
    assert_eq!(outcome.requested_start, start);
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].timestamp, start);
    assert_eq!(outcome.steps[1].timestamp, start + Duration::hours(1));
}

#[test]
fn live_source_without_start_anchors_to_now() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let base_ts = window.last().unwrap().open_time;
    let now = base_ts + Duration::hours(2);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 2, None, DataSource::Live);

    let outcome = run_forecast(window, &b, &req, now).unwrap();

    assert_eq!(outcome.requested_start, now);
    assert_eq!(outcome.steps[0].timestamp, now);
}

#[test]
fn past_start_time_needs_no_warmup() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let base_ts = window.last().unwrap().open_time;
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(
        Horizon::OneHour,
        1,
        Some(base_ts - Duration::hours(12)),
        DataSource::Stored,
    );

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();
    assert_eq!(outcome.steps[0].timestamp, base_ts + Duration::hours(1));
}

#[test]
fn excessive_warmup_is_rejected() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let base_ts = window.last().unwrap().open_time;
    // WARMUP_CAP + 2 hours ahead -> WARMUP_CAP + 1 warmup steps
    let start = base_ts + Duration::hours(WARMUP_CAP as i64 + 2);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 1, Some(start), DataSource::Stored);

    let err = run_forecast(window, &b, &req, t0()).unwrap_err();
    match err {
        ForecastError::ExcessiveWarmup { computed, cap, .. } => {
            assert_eq!(computed, WARMUP_CAP + 1);
            assert_eq!(cap, WARMUP_CAP);
        }
        other => panic!("expected ExcessiveWarmup, got {other}"),
    }
}

#[test]
fn warmup_at_the_cap_still_runs() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let base_ts = window.last().unwrap().open_time;
    let start = base_ts + Duration::hours(WARMUP_CAP as i64 + 1);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 1, Some(start), DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].timestamp, start);
}

#[test]
fn zero_steps_is_rejected() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 0, None, DataSource::Stored);

    assert!(matches!(
        run_forecast(window, &b, &req, t0()),
        Err(ForecastError::InvalidStepCount(0))
    ));
}

#[test]
fn short_history_is_rejected_with_counts() {
    let window = hourly_window(10, 100.0);
    let b = bundle(Arc::new(FixedRegressor(0.5)));
    let req = request(Horizon::OneHour, 1, None, DataSource::Stored);

    match run_forecast(window, &b, &req, t0()).unwrap_err() {
        ForecastError::InsufficientHistory { have, need, .. } => {
            assert_eq!(have, 10);
            assert_eq!(need, SEQ_LEN);
        }
        other => panic!("expected InsufficientHistory, got {other}"),
    }
}

#[test]
fn scaler_width_mismatch_is_rejected() {
    let window = hourly_window(SEQ_LEN + 1, 100.0);
    let b = bundle_with_feature_width(Arc::new(FixedRegressor(0.5)), 9);
    let req = request(Horizon::OneHour, 1, None, DataSource::Stored);

    match run_forecast(window, &b, &req, t0()).unwrap_err() {
        ForecastError::FeatureScalerMismatch { expected, actual } => {
            assert_eq!(expected, 9);
            assert_eq!(actual, 11);
        }
        other => panic!("expected FeatureScalerMismatch, got {other}"),
    }
}

#[test]
fn regressor_output_is_clipped_to_the_fitted_range() {
    // raw output far above the scaler ceiling must inverse-map to the fitted
    // maximum, not beyond it
    let window = hourly_window(SEQ_LEN, 100.0);
    let b = bundle(Arc::new(FixedRegressor(25.0)));
    let req = request(Horizon::OneHour, 1, None, DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();
    assert!((outcome.steps[0].predicted_price - PRICE_MAX).abs() < 1e-9);
}

#[test]
fn identical_requests_yield_identical_forecasts() {
    let window = hourly_window(SEQ_LEN + 1, 150.0);
    let b = bundle(Arc::new(TrendRegressor { gain: 1.01 }));
    let req = request(Horizon::OneHour, 6, None, DataSource::Stored);

    let a = run_forecast(window.clone(), &b, &req, t0()).unwrap();
    let c = run_forecast(window, &b, &req, t0()).unwrap();

    assert_eq!(a.steps.len(), c.steps.len());
    for (x, y) in a.steps.iter().zip(&c.steps) {
        assert_eq!(x.timestamp, y.timestamp);
        assert_eq!(x.predicted_price.to_bits(), y.predicted_price.to_bits());
    }
}

#[test]
fn autoregressive_feedback_flows_through_synthesized_rows() {
    // each step opens at the previous prediction, so a gain > 1 compounds
    // (no calibration here: the window is too short to retrodict)
    let window = hourly_window(SEQ_LEN, 100.0);
    let b = bundle(Arc::new(TrendRegressor { gain: 1.01 }));
    let req = request(Horizon::OneHour, 4, None, DataSource::Stored);

    let outcome = run_forecast(window, &b, &req, t0()).unwrap();
    for pair in outcome.steps.windows(2) {
        assert!(pair[1].predicted_price > pair[0].predicted_price);
    }
}
