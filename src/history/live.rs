use chrono::{Duration, Utc};

use crate::error::ForecastError;
use crate::feature::engineer::engineer_features;
use crate::feature::engineer::RawCandle;
use crate::instrument::Instrument;
use crate::model::feature_row::FeatureRow;

const KLINE_PAGE_LIMIT: u32 = 1000;
const PAGE_PAUSE_MS: u64 = 250;

/// Public-market-data client for the live history path. No credentials: the
/// kline endpoint is unauthenticated, and everything requiring auth lives
/// outside this crate.
pub struct LiveHistory {
    http: reqwest::Client,
    base_url: String,
    lookback_hours: u32,
}

impl LiveHistory {
    pub fn new(base_url: &str, lookback_hours: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            lookback_hours,
        }
    }

    /// Fetch the recent lookback span, gap-fill it onto the hourly grid, run
    /// feature engineering, and return the newest `want` rows oldest-first.
    pub async fn recent(
        &self,
        instrument: Instrument,
        min: usize,
        want: usize,
    ) -> Result<Vec<FeatureRow>, ForecastError> {
        let end = Utc::now();
        let start = end - Duration::hours(i64::from(self.lookback_hours));
        let candles = self
            .fetch_klines(
                instrument,
                start.timestamp_millis(),
                end.timestamp_millis(),
            )
            .await?;

        let rows = engineer_features(&candles);
        let tail_start = rows.len().saturating_sub(want);
        let tail = rows[tail_start..].to_vec();
        if tail.len() < min {
            return Err(ForecastError::InsufficientHistory {
                instrument: instrument.id().to_string(),
                have: tail.len(),
                need: min,
            });
        }
        Ok(tail)
    }

    /// Paginated kline fetch: advance past the last open time of each page,
    /// stop on an empty page or at the end of the span.
    async fn fetch_klines(
        &self,
        instrument: Instrument,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<RawCandle>, ForecastError> {
        let symbol = instrument.exchange_symbol();
        let mut out: Vec<RawCandle> = Vec::new();
        let mut cursor = start_ms;

        while cursor < end_ms {
            let url = format!(
                "{}/api/v3/klines?symbol={}&interval=1h&startTime={}&endTime={}&limit={}",
                self.base_url, symbol, cursor, end_ms, KLINE_PAGE_LIMIT
            );
            let resp = self.http.get(&url).send().await.map_err(|e| {
                ForecastError::upstream("history", format!("kline request for {symbol}: {e}"))
            })?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ForecastError::upstream(
                    "history",
                    format!("kline request for {symbol} returned {status}: {body}"),
                ));
            }
            let page: Vec<Vec<serde_json::Value>> = resp.json().await.map_err(|e| {
                ForecastError::upstream("history", format!("kline payload for {symbol}: {e}"))
            })?;
            if page.is_empty() {
                break;
            }

            for kline in &page {
                out.push(parse_kline(kline)?);
            }

            let Some(last) = out.last() else { break };
            let next = last.open_time.timestamp_millis() + 1;
            if next <= cursor {
                break;
            }
            cursor = next;

            if page.len() as u32 == KLINE_PAGE_LIMIT {
                // exchange rate limiting between full pages
                tokio::time::sleep(std::time::Duration::from_millis(PAGE_PAUSE_MS)).await;
            }
        }

        if out.is_empty() {
            return Err(ForecastError::upstream(
                "history",
                format!("no klines returned for {symbol}"),
            ));
        }

        tracing::debug!(symbol, candles = out.len(), "kline fetch complete");
        Ok(out)
    }
}

/// One kline row arrives as a mixed array:
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`
/// with prices quoted as strings.
fn parse_kline(raw: &[serde_json::Value]) -> Result<RawCandle, ForecastError> {
    if raw.len() < 6 {
        return Err(ForecastError::upstream(
            "history",
            format!("short kline row ({} fields)", raw.len()),
        ));
    }
    let open_ms = raw[0]
        .as_i64()
        .ok_or_else(|| ForecastError::upstream("history", "kline open time is not an integer"))?;
    let open_time = chrono::TimeZone::timestamp_millis_opt(&Utc, open_ms)
        .single()
        .ok_or_else(|| {
            ForecastError::upstream("history", format!("kline open time {open_ms} out of range"))
        })?;

    let num = |idx: usize| -> Result<f64, ForecastError> {
        let v = &raw[idx];
        v.as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| v.as_f64())
            .ok_or_else(|| {
                ForecastError::upstream("history", format!("kline field {idx} is not numeric: {v}"))
            })
    };

    Ok(RawCandle {
        open_time,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}
