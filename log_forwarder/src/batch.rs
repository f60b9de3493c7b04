use crate::record::{LogRecord, TIMESTAMP_FIELD};
use chrono::{NaiveDateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::info;

/// PutLogEvents quota on the total size of one request.
pub const MAX_BATCH_BYTES: usize = 1_048_576;
/// PutLogEvents quota on the number of events in one request.
pub const MAX_BATCH_COUNT: usize = 10_000;
/// Bytes CloudWatch Logs adds to every event when checking the size quota.
pub const LOG_EVENT_OVERHEAD: usize = 26;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("could not find timestamp in record")]
    MissingTimestamp,
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_bytes: usize,
    pub max_count: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_BATCH_BYTES,
            max_count: MAX_BATCH_COUNT,
        }
    }
}

/// A serialized record ready for ingestion. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    events: Vec<LogEvent>,
    size: usize,
}

impl Batch {
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
    }

    /// Accounted size: serialized lengths plus the per-event overhead.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub fn parse_timestamp(value: &str) -> Result<i64, PlanError> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| {
        PlanError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })?;
    Ok(Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// Splits records into batches that fit the PutLogEvents quotas, keeping
/// input order.
///
/// The size check runs after the record's size has been counted but before
/// the record is appended, so a record that pushes the running total to the
/// limit starts the next batch. The trailing batch is always emitted, even
/// when empty.
pub fn plan_batches<I>(records: I, limits: BatchLimits) -> Result<Vec<Batch>, PlanError>
where
    I: IntoIterator<Item = LogRecord>,
{
    let mut batches = Vec::new();
    let mut batch = Batch::default();

    for record in records {
        let message = record.to_json()?;
        let event_size = message.len() + LOG_EVENT_OVERHEAD;

        if batch.size + event_size >= limits.max_bytes || batch.len() >= limits.max_count {
            batches.push(std::mem::take(&mut batch));
        }

        let timestamp = record
            .get(TIMESTAMP_FIELD)
            .ok_or(PlanError::MissingTimestamp)?;
        batch.events.push(LogEvent {
            timestamp: parse_timestamp(timestamp)?,
            message,
        });
        batch.size += event_size;
    }

    batches.push(batch);
    info!("batch count is: {}", batches.len());
    Ok(batches)
}
