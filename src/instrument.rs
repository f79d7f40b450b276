use std::fmt;
use std::str::FromStr;

use chrono::Duration;

use crate::error::ForecastError;

/// Instruments with a trained model and exported scalers. Anything outside
/// this registry is rejected before any model or history access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Bitcoin,
    Ethereum,
    Solana,
    Cardano,
    Binancecoin,
}

impl Instrument {
    pub fn all() -> [Instrument; 5] {
        [
            Instrument::Bitcoin,
            Instrument::Ethereum,
            Instrument::Solana,
            Instrument::Cardano,
            Instrument::Binancecoin,
        ]
    }

    /// Identifier used in model/scaler paths, the history table, and API
    /// payloads.
    pub fn id(&self) -> &'static str {
        match self {
            Instrument::Bitcoin => "bitcoin",
            Instrument::Ethereum => "ethereum",
            Instrument::Solana => "solana",
            Instrument::Cardano => "cardano",
            Instrument::Binancecoin => "binancecoin",
        }
    }

    /// Exchange symbol for the live kline feed.
    pub fn exchange_symbol(&self) -> &'static str {
        match self {
            Instrument::Bitcoin => "BTCUSDT",
            Instrument::Ethereum => "ETHUSDT",
            Instrument::Solana => "SOLUSDT",
            Instrument::Cardano => "ADAUSDT",
            Instrument::Binancecoin => "BNBUSDT",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Instrument {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" => Ok(Instrument::Bitcoin),
            "ethereum" => Ok(Instrument::Ethereum),
            "solana" => Ok(Instrument::Solana),
            "cardano" => Ok(Instrument::Cardano),
            "binancecoin" => Ok(Instrument::Binancecoin),
            other => Err(ForecastError::UnsupportedInstrument(other.to_string())),
        }
    }
}

/// Hours between consecutive forecast points. The step size of the
/// autoregressive loop, not the model's input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    OneHour,
    OneDay,
}

impl Horizon {
    pub fn hours(&self) -> i64 {
        match self {
            Horizon::OneHour => 1,
            Horizon::OneDay => 24,
        }
    }

    /// Label used in model paths and API payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::OneHour => "1h",
            Horizon::OneDay => "24h",
        }
    }

    /// Timestamp advance of one autoregressive step.
    pub fn step(&self) -> Duration {
        Duration::hours(self.hours())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Horizon {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" => Ok(Horizon::OneHour),
            "24h" => Ok(Horizon::OneDay),
            other => Err(ForecastError::UnsupportedHorizon(other.to_string())),
        }
    }
}
