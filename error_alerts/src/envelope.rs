use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

pub const UNPARSED_MESSAGE: &str = "Message could not be parsed.";

/// Event delivered by a CloudWatch Logs subscription filter.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEvent {
    pub awslogs: AwsLogs,
}

/// `data` is base64(gzip(json)).
#[derive(Debug, Clone, Deserialize)]
pub struct AwsLogs {
    pub data: String,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload could not be decompressed: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),
}

/// The parts of a delivered log batch an alert is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEnvelope {
    pub log_group: String,
    pub log_stream: String,
    pub subscription_filters: Vec<String>,
    /// `message` of the first log event, or [`UNPARSED_MESSAGE`].
    pub message: Value,
}

impl AlertEnvelope {
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let log_group = value
            .get("logGroup")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MalformedEnvelope("logGroup is missing or not a string"))?;
        let log_stream = value
            .get("logStream")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MalformedEnvelope("logStream is missing or not a string"))?;
        let subscription_filters = value
            .get("subscriptionFilters")
            .and_then(Value::as_array)
            .map(|filters| {
                filters
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let message = value
            .get("logEvents")
            .and_then(|events| events.get(0))
            .and_then(|event| event.get("message"))
            .filter(|message| !message.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(UNPARSED_MESSAGE.to_string()));

        Ok(AlertEnvelope {
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
            subscription_filters,
            message,
        })
    }
}

/// Decodes the `awslogs.data` payload into its JSON document.
pub fn decode_payload(data: &str) -> Result<Value, EnvelopeError> {
    let compressed = STANDARD.decode(data.trim())?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

pub fn decode_envelope(data: &str) -> Result<AlertEnvelope, EnvelopeError> {
    AlertEnvelope::from_value(&decode_payload(data)?)
}
