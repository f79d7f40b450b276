use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ForecastError;
use crate::forecast::driver::{ForecastOutcome, ForecastRequest};
use crate::forecast::service::Forecaster;
use crate::history::DataSource;
use crate::model_store::FsModelSource;

pub type AppForecaster = Forecaster<FsModelSource>;

fn default_steps() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub instrument: String,
    pub horizon: String,
    #[serde(default = "default_steps")]
    pub steps_ahead: u32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_source: DataSource,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub instrument: String,
    pub horizon: String,
    #[serde(flatten)]
    pub outcome: ForecastOutcome,
}

pub fn router(service: Arc<AppForecaster>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

async fn predict(
    State(service): State<Arc<AppForecaster>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<PredictResponse>, ForecastError> {
    let request = ForecastRequest {
        instrument: body.instrument.parse()?,
        horizon: body.horizon.parse()?,
        steps_ahead: body.steps_ahead,
        start_time: body.start_time,
        data_source: body.data_source,
    };

    let instrument = request.instrument.to_string();
    let horizon = request.horizon.to_string();
    let outcome = service.forecast(request).await?;

    Ok(Json(PredictResponse {
        instrument,
        horizon,
        outcome,
    }))
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = match &self {
            ForecastError::UnsupportedInstrument(_)
            | ForecastError::UnsupportedHorizon(_)
            | ForecastError::InvalidStepCount(_)
            | ForecastError::InsufficientHistory { .. }
            | ForecastError::ExcessiveWarmup { .. } => StatusCode::BAD_REQUEST,
            ForecastError::UpstreamUnavailable { .. } | ForecastError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            ForecastError::FeatureScalerMismatch { .. }
            | ForecastError::Json(_)
            | ForecastError::Db(_)
            | ForecastError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
