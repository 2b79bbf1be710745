//! Prediction collaborator interface and adapters.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::types::{Bar, PredictionResult, PredictionSettings, SessionId, TradeSignal};

/// A request for one prediction, tagged with the session that issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub session: SessionId,
    pub pair: String,
    /// Trailing bars, truncated to the configured history length.
    pub bars: Vec<Bar>,
    pub settings: PredictionSettings,
}

/// Boxed future returned by [`Predictor::predict`].
pub type PredictionFuture<'a> = Pin<Box<dyn Future<Output = Result<PredictionResult>> + Send + 'a>>;

/// External service that turns a window of bars into a price prediction and
/// trade signal.
pub trait Predictor: Send + Sync {
    fn predict<'a>(&'a self, request: &'a PredictionRequest) -> PredictionFuture<'a>;
}

/// Predictor used when no service is configured. Every request fails, which
/// surfaces as an error state without touching the window.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredPredictor;

impl Predictor for UnconfiguredPredictor {
    fn predict<'a>(&'a self, _request: &'a PredictionRequest) -> PredictionFuture<'a> {
        Box::pin(async { Err(AppError::Prediction("predictor not configured".to_string())) })
    }
}

/// Body posted to an HTTP prediction service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionPayload<'a> {
    pair: &'a str,
    closes: Vec<f64>,
    bars: &'a [Bar],
    temperature: f64,
    history_length: usize,
}

/// Response as returned by the service, before signal coercion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    predicted_price: f64,
    #[serde(default)]
    signal: Option<String>,
    #[serde(default)]
    rationale: String,
}

impl RawPrediction {
    fn into_result(self) -> Result<PredictionResult> {
        if !self.predicted_price.is_finite() {
            return Err(AppError::Prediction(format!(
                "non-finite predicted price {}",
                self.predicted_price
            )));
        }

        let raw_signal = self.signal.unwrap_or_default();
        let signal = TradeSignal::from_str(&raw_signal).unwrap_or_else(|| {
            warn!("Invalid signal received: {:?}, defaulting to HOLD", raw_signal);
            TradeSignal::Hold
        });

        Ok(PredictionResult {
            predicted_price: self.predicted_price,
            signal,
            rationale: self.rationale,
        })
    }
}

/// Decode a service response body.
pub fn parse_prediction(body: &str) -> Result<PredictionResult> {
    let raw: RawPrediction = serde_json::from_str(body.trim())?;
    raw.into_result()
}

/// Predictor backed by a JSON-over-HTTP service.
pub struct HttpPredictor {
    client: reqwest::Client,
    url: String,
}

impl HttpPredictor {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn request(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let payload = PredictionPayload {
            pair: &request.pair,
            closes: request.bars.iter().map(|b| b.close).collect(),
            bars: &request.bars,
            temperature: request.settings.temperature,
            history_length: request.settings.history_length,
        };

        debug!(
            "Requesting prediction for {} over {} bars",
            request.pair,
            request.bars.len()
        );

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        parse_prediction(&body)
    }
}

impl Predictor for HttpPredictor {
    fn predict<'a>(&'a self, request: &'a PredictionRequest) -> PredictionFuture<'a> {
        Box::pin(self.request(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictionRequest {
        PredictionRequest {
            session: SessionId {
                pair: "EUR/USD".to_string(),
                generation: 0,
            },
            pair: "EUR/USD".to_string(),
            bars: vec![Bar::new(1, 1.0855, 1.0857, 1.0853, 1.0856)],
            settings: PredictionSettings::default(),
        }
    }

    #[test]
    fn test_parse_prediction() {
        let body = r#"{"predictedPrice": 1.0861, "signal": "buy", "rationale": "Higher lows."}"#;
        let result = parse_prediction(body).unwrap();
        assert_eq!(result.predicted_price, 1.0861);
        assert_eq!(result.signal, TradeSignal::Buy);
        assert_eq!(result.rationale, "Higher lows.");
    }

    #[test]
    fn test_parse_prediction_unknown_signal_is_hold() {
        let body = r#"{"predictedPrice": 1.0861, "signal": "STRONG BUY", "rationale": ""}"#;
        assert_eq!(parse_prediction(body).unwrap().signal, TradeSignal::Hold);

        let missing = r#"{"predictedPrice": 1.0861}"#;
        assert_eq!(parse_prediction(missing).unwrap().signal, TradeSignal::Hold);
    }

    #[test]
    fn test_parse_prediction_malformed() {
        assert!(matches!(
            parse_prediction("not json"),
            Err(AppError::SerdeJson(_))
        ));
        assert!(parse_prediction(r#"{"signal": "BUY"}"#).is_err());
    }

    #[test]
    fn test_payload_shape() {
        let req = request();
        let payload = PredictionPayload {
            pair: &req.pair,
            closes: req.bars.iter().map(|b| b.close).collect(),
            bars: &req.bars,
            temperature: req.settings.temperature,
            history_length: req.settings.history_length,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["pair"], "EUR/USD");
        assert_eq!(json["historyLength"], 50);
        assert_eq!(json["closes"][0], 1.0856);
    }

    #[tokio::test]
    async fn test_unconfigured_predictor_fails() {
        let req = request();
        let result = UnconfiguredPredictor.predict(&req).await;
        assert!(matches!(result, Err(AppError::Prediction(_))));
    }
}
