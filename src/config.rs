use std::env;
use std::time::Duration;

use crate::types::PredictionSettings;

/// Smallest bar window the server will run with.
pub const MIN_WINDOW_CAPACITY: usize = 20;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Currency pair analysed at startup.
    pub default_pair: String,
    /// Bars sent with each prediction request.
    pub history_length: usize,
    /// Sampling temperature forwarded to the predictor.
    pub temperature: f64,
    /// Maximum bars kept in the window.
    pub window_capacity: usize,
    /// Simulated feed tick interval (ms).
    pub tick_interval_ms: u64,
    /// Prediction service endpoint. Without one every request fails.
    pub predictor_url: Option<String>,
    /// Prediction request timeout (ms).
    pub predictor_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = PredictionSettings {
            temperature: lookup("TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.5),
            history_length: lookup("HISTORY_LENGTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        }
        .normalized();

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            default_pair: lookup("DEFAULT_PAIR").unwrap_or_else(|| "EUR/USD".to_string()),
            history_length: settings.history_length,
            temperature: settings.temperature,
            window_capacity: lookup("WINDOW_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100usize)
                .max(MIN_WINDOW_CAPACITY),
            tick_interval_ms: lookup("TICK_INTERVAL_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(2000),
            predictor_url: lookup("PREDICTOR_URL").filter(|url| !url.trim().is_empty()),
            predictor_timeout_ms: lookup("PREDICTOR_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(15_000),
        }
    }

    pub fn prediction_settings(&self) -> PredictionSettings {
        PredictionSettings {
            temperature: self.temperature,
            history_length: self.history_length,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
