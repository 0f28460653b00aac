//! Valuation gateway: turns a completed answer record into a price estimate.
//!
//! The wizard only depends on [`ValuationGateway`]; [`HttpGateway`] is the
//! production implementation talking to the prediction service over HTTP.

pub mod http;

pub use http::{HttpGateway, PastPrediction, ServiceHealth};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::wizard::AnswerRecord;

/// JSON field of the predict response holding the estimate.
pub const ESTIMATE_FIELD: &str = "predicted_price_lakhs";

/// A price estimate, in lakhs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub lakhs: f64,
}

impl Estimate {
    pub fn new(lakhs: f64) -> Self {
        Self { lakhs }
    }

    /// Read the estimate out of a predict response body.
    ///
    /// A missing, non-numeric or non-finite value is an error.
    pub fn from_response(body: &serde_json::Value) -> Result<Self, GatewayError> {
        body.get(ESTIMATE_FIELD)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .map(Self::new)
            .ok_or(GatewayError::MissingEstimate)
    }

    /// Two decimal places, as shown in the transcript. Exact ties round
    /// away from zero, like `Number.prototype.toFixed`.
    pub fn formatted(&self) -> String {
        // Only odd multiples of 1/8 sit exactly halfway between cents.
        let eighths = self.lakhs * 8.0;
        let value = if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
            (self.lakhs * 100.0).round() / 100.0
        } else {
            self.lakhs
        };
        format!("{value:.2}")
    }
}

/// Backend-agnostic valuation service.
#[async_trait]
pub trait ValuationGateway: Send + Sync {
    /// Submit a completed record. Called once per completed questionnaire
    /// (and once more per retry of the final answer).
    async fn estimate(&self, record: &AnswerRecord) -> Result<Estimate, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_has_two_decimals() {
        assert_eq!(Estimate::new(5.234).formatted(), "5.23");
        assert_eq!(Estimate::new(7.0).formatted(), "7.00");
        assert_eq!(Estimate::new(12.5).formatted(), "12.50");
    }

    #[test]
    fn formatted_rounds_exact_ties_up() {
        assert_eq!(Estimate::new(5.125).formatted(), "5.13");
        assert_eq!(Estimate::new(0.125).formatted(), "0.13");
        assert_eq!(Estimate::new(2.625).formatted(), "2.63");
        assert_eq!(Estimate::new(0.375).formatted(), "0.38");
        assert_eq!(Estimate::new(-0.125).formatted(), "-0.13");
    }

    #[test]
    fn formatted_leaves_inexact_halves_alone() {
        // 2.675 is stored just below the half, so it rounds down.
        assert_eq!(Estimate::new(2.675).formatted(), "2.67");
        assert_eq!(Estimate::new(1.005).formatted(), "1.00");
    }

    #[test]
    fn from_response_reads_estimate() {
        let body = serde_json::json!({"predicted_price_lakhs": 5.234});
        assert_eq!(Estimate::from_response(&body).unwrap(), Estimate::new(5.234));
    }

    #[test]
    fn from_response_accepts_integer_estimate() {
        let body = serde_json::json!({"predicted_price_lakhs": 4});
        assert_eq!(Estimate::from_response(&body).unwrap().formatted(), "4.00");
    }

    #[test]
    fn from_response_missing_field_is_error() {
        let body = serde_json::json!({"price": 5.0});
        assert!(matches!(
            Estimate::from_response(&body),
            Err(GatewayError::MissingEstimate)
        ));
    }

    #[test]
    fn from_response_non_numeric_is_error() {
        let body = serde_json::json!({"predicted_price_lakhs": "5.23"});
        assert!(Estimate::from_response(&body).is_err());
        let body = serde_json::json!({"predicted_price_lakhs": null});
        assert!(Estimate::from_response(&body).is_err());
    }
}
