//! Call-outcome analytics.
//!
//! Every normally stopped call produces a [`CallSummary`] that is posted to
//! the configured webhooks: the call-data webhook receives every summary, and
//! the record webhook additionally receives an enriched payload when a
//! structured record was collected. Delivery is fire-and-forget; a webhook
//! failure is logged and never blocks call teardown.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Errors from webhook delivery.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The HTTP request could not be sent
    #[error("Webhook request failed: {0}")]
    Request(String),

    /// The webhook answered with a non-success status
    #[error("Webhook rejected payload with status {0}")]
    Rejected(u16),
}

/// Outcome summary for one normally finished call. Abnormal endings
/// (telephony disconnect without `stop`, AI-side failure) produce no summary.
#[derive(Debug, Clone, Serialize)]
pub struct CallSummary {
    /// Call SID, the session key
    pub call_sid: String,
    /// Caller phone number, when the telephony stream carried it
    pub caller_phone: Option<String>,
    /// Call duration in whole seconds
    pub call_duration: u64,
    /// RFC 3339 timestamp of call end
    pub timestamp: String,
    /// Always "completed"; only normal stops are summarized
    pub call_status: String,
    /// Tenant decision tag (e.g. `estimate_booked`, `no_estimate`)
    pub decision: String,
    /// Human-readable reason paired with the decision
    pub reason: String,
    /// The collected record, when one was persisted during the call
    pub collected: Option<Value>,
}

impl CallSummary {
    /// Current time as an RFC 3339 string.
    pub fn now_timestamp() -> String {
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default()
    }

    /// Enriched payload for the record webhook: the collected fields plus
    /// the call metadata.
    pub fn record_payload(&self) -> Option<Value> {
        let collected = self.collected.as_ref()?;
        let mut payload = collected.clone();
        if let Some(object) = payload.as_object_mut() {
            object.insert("call_sid".to_string(), json!(self.call_sid));
            object.insert("caller_phone".to_string(), json!(self.caller_phone));
            object.insert("timestamp".to_string(), json!(self.timestamp));
        }
        Some(payload)
    }
}

/// Delivers call summaries to external consumers.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Deliver the summary of a finished call.
    async fn report_call(&self, summary: &CallSummary) -> Result<(), AnalyticsError>;

    /// Deliver the enriched record payload, when a record was collected.
    async fn report_record(&self, summary: &CallSummary) -> Result<(), AnalyticsError>;
}

/// Webhook-backed sink. Unconfigured endpoints are skipped silently.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: reqwest::Client,
    call_data_url: Option<String>,
    record_url: Option<String>,
}

impl WebhookReporter {
    /// Create a reporter for the configured endpoints.
    pub fn new(call_data_url: Option<String>, record_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            call_data_url,
            record_url,
        }
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AnalyticsError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AnalyticsError::Rejected(status.as_u16()))
        }
    }
}

#[async_trait]
impl AnalyticsSink for WebhookReporter {
    async fn report_call(&self, summary: &CallSummary) -> Result<(), AnalyticsError> {
        let Some(url) = self.call_data_url.as_deref() else {
            return Ok(());
        };
        let payload =
            serde_json::to_value(summary).map_err(|e| AnalyticsError::Request(e.to_string()))?;
        self.post(url, &payload).await
    }

    async fn report_record(&self, summary: &CallSummary) -> Result<(), AnalyticsError> {
        let Some(url) = self.record_url.as_deref() else {
            return Ok(());
        };
        let Some(payload) = summary.record_payload() else {
            return Ok(());
        };
        self.post(url, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with_record() -> CallSummary {
        CallSummary {
            call_sid: "CA1".to_string(),
            caller_phone: Some("+15551234567".to_string()),
            call_duration: 95,
            timestamp: "2025-03-01T12:00:00Z".to_string(),
            call_status: "completed".to_string(),
            decision: "estimate_booked".to_string(),
            reason: "Client scheduled an in-person cleaning estimate".to_string(),
            collected: Some(json!({"phone": "+15551234567", "bedrooms": 3})),
        }
    }

    #[test]
    fn test_summary_serialization() {
        let summary = summary_with_record();
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["call_sid"], "CA1");
        assert_eq!(value["call_status"], "completed");
        assert_eq!(value["call_duration"], 95);
        assert_eq!(value["collected"]["bedrooms"], 3);
    }

    #[test]
    fn test_record_payload_is_enriched() {
        let payload = summary_with_record().record_payload().unwrap();
        assert_eq!(payload["bedrooms"], 3);
        assert_eq!(payload["call_sid"], "CA1");
        assert_eq!(payload["caller_phone"], "+15551234567");
        assert_eq!(payload["timestamp"], "2025-03-01T12:00:00Z");
    }

    #[test]
    fn test_record_payload_absent_without_record() {
        let summary = CallSummary {
            collected: None,
            decision: "no_estimate".to_string(),
            ..summary_with_record()
        };
        assert!(summary.record_payload().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_endpoints_are_skipped() {
        let reporter = WebhookReporter::new(None, None);
        let summary = summary_with_record();
        assert!(reporter.report_call(&summary).await.is_ok());
        assert!(reporter.report_record(&summary).await.is_ok());
    }

    #[test]
    fn test_now_timestamp_is_rfc3339() {
        let ts = CallSummary::now_timestamp();
        assert!(OffsetDateTime::parse(&ts, &Rfc3339).is_ok());
    }
}
