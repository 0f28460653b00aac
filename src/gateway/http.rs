//! HTTP client for the prediction service.
//!
//! `POST /predict` does the valuation; `GET /health` and `GET /history` are
//! auxiliary and never touch the wizard state.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Estimate, ValuationGateway};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::wizard::AnswerRecord;

/// `GET /health` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    pub ok: bool,
    /// Feature columns the model was trained on.
    #[serde(default)]
    pub features: Vec<String>,
}

/// One stored prediction from `GET /history`.
#[derive(Debug, Clone, Deserialize)]
pub struct PastPrediction {
    pub id: i64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub km_driven: Option<i64>,
    pub owners: Option<i64>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub engine_cc: Option<i64>,
    pub seats: Option<i64>,
    pub predicted_price: Option<f64>,
    /// ISO-8601 local time as written by the service.
    pub timestamp: Option<String>,
}

impl PastPrediction {
    /// Parsed `timestamp`, if present and well-formed.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref()?.parse().ok()
    }

    /// One-line summary for listings.
    pub fn summary(&self) -> String {
        let vehicle = [self.brand.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let vehicle = if vehicle.is_empty() { "(unknown)".to_string() } else { vehicle };
        let year = self.year.map(|y| format!(" {y}")).unwrap_or_default();
        let price = self
            .predicted_price
            .map(|p| format!("₹{p:.2} Lakhs"))
            .unwrap_or_else(|| "no estimate".to_string());
        let when = self
            .recorded_at()
            .map(|t| format!(" ({})", t.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        format!("#{} {vehicle}{year}: {price}{when}", self.id)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    predictions: Vec<PastPrediction>,
}

/// Valuation gateway backed by the prediction service's REST API.
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| GatewayError::Transport {
            url: config.base_url.clone(),
            reason: format!("Failed to create HTTP client: {e}"),
        })?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<ServiceHealth, GatewayError> {
        let url = self.config.endpoint("/health");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        let body = self.read_json(resp).await?;
        serde_json::from_value(body).map_err(|e| GatewayError::MalformedResponse {
            reason: e.to_string(),
        })
    }

    /// `GET /history`, oldest first as stored by the service.
    pub async fn history(&self) -> Result<Vec<PastPrediction>, GatewayError> {
        let url = self.config.endpoint("/history");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        let body = self.read_json(resp).await?;
        let history: HistoryResponse =
            serde_json::from_value(body).map_err(|e| GatewayError::MalformedResponse {
                reason: e.to_string(),
            })?;
        debug!(count = history.predictions.len(), "Fetched prediction history");
        Ok(history.predictions)
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> GatewayError {
        match self.config.timeout {
            Some(timeout) if e.is_timeout() => GatewayError::Timeout {
                url: url.to_string(),
                timeout,
            },
            _ => GatewayError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Check the status and decode a JSON body.
    async fn read_json(&self, resp: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| GatewayError::MalformedResponse {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ValuationGateway for HttpGateway {
    async fn estimate(&self, record: &AnswerRecord) -> Result<Estimate, GatewayError> {
        let url = self.config.endpoint("/predict");
        debug!(url = %url, fields = record.len(), "Submitting record for valuation");

        let resp = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        let body = self.read_json(resp).await?;
        let estimate = Estimate::from_response(&body)?;

        info!(lakhs = estimate.lakhs, "Valuation received");
        Ok(estimate)
    }
}
