use chrono::{DateTime, Utc};

use crate::error::ForecastError;
use crate::forecast::driver::{run_forecast, ForecastOutcome, ForecastRequest, SEQ_LEN};
use crate::history::live::LiveHistory;
use crate::history::stored::StoredHistory;
use crate::history::DataSource;
use crate::model::window::FeatureWindow;
use crate::model_store::{ModelKey, ModelSource, ModelStore};

/// The one operation this crate exposes to callers: validate the request,
/// gather history, fetch the model bundle, and drive the autoregressive loop.
pub struct Forecaster<S: ModelSource> {
    store: ModelStore<S>,
    stored: StoredHistory,
    live: LiveHistory,
}

impl<S: ModelSource> Forecaster<S> {
    pub fn new(store: ModelStore<S>, stored: StoredHistory, live: LiveHistory) -> Self {
        Self {
            store,
            stored,
            live,
        }
    }

    pub async fn forecast(&self, request: ForecastRequest) -> Result<ForecastOutcome, ForecastError> {
        self.forecast_at(request, Utc::now()).await
    }

    /// `now` is injected so replays and tests are reproducible.
    pub async fn forecast_at(
        &self,
        request: ForecastRequest,
        now: DateTime<Utc>,
    ) -> Result<ForecastOutcome, ForecastError> {
        if request.steps_ahead < 1 {
            return Err(ForecastError::InvalidStepCount(request.steps_ahead));
        }

        // One extra observation beyond the model window lets calibration
        // retrodict the last observed close.
        let want = SEQ_LEN + 1;
        let rows = match request.data_source {
            DataSource::Stored => self.stored.recent(request.instrument, SEQ_LEN, want)?,
            DataSource::Live => self.live.recent(request.instrument, SEQ_LEN, want).await?,
        };
        let window = FeatureWindow::from_rows(rows)?;

        let key = ModelKey {
            instrument: request.instrument,
            horizon: request.horizon,
        };
        let bundle = self.store.get(key).await?;

        run_forecast(window, &bundle, &request, now)
    }
}
