use crate::batch::LogEvent;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs as logs;
use aws_sdk_cloudwatchlogs::model::InputLogEvent;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct LogsApiError {
    pub operation: &'static str,
    pub message: String,
}

impl LogsApiError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// The CloudWatch Logs calls the forwarder needs.
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Names of the log groups starting with `prefix`.
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>, LogsApiError>;

    async fn create_log_group(&self, name: &str) -> Result<(), LogsApiError>;

    /// Names of the streams in `group` starting with `prefix`.
    async fn describe_log_streams(&self, group: &str, prefix: &str) -> Result<Vec<String>, LogsApiError>;

    async fn create_log_stream(&self, group: &str, name: &str) -> Result<(), LogsApiError>;

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
    ) -> Result<(), LogsApiError>;
}

pub struct CloudWatchLogs {
    client: logs::Client,
}

impl CloudWatchLogs {
    pub fn new(client: logs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogsApi for CloudWatchLogs {
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>, LogsApiError> {
        let output = self
            .client
            .describe_log_groups()
            .set_log_group_name_prefix(Some(prefix.to_string()))
            .send()
            .await
            .map_err(|e| LogsApiError::new("DescribeLogGroups", format!("{:?}", e)))?;
        Ok(output
            .log_groups()
            .unwrap_or_default()
            .iter()
            .filter_map(|group| group.log_group_name().map(String::from))
            .collect())
    }

    async fn create_log_group(&self, name: &str) -> Result<(), LogsApiError> {
        self.client
            .create_log_group()
            .set_log_group_name(Some(name.to_string()))
            .send()
            .await
            .map_err(|e| LogsApiError::new("CreateLogGroup", format!("{:?}", e)))?;
        Ok(())
    }

    async fn describe_log_streams(&self, group: &str, prefix: &str) -> Result<Vec<String>, LogsApiError> {
        let output = self
            .client
            .describe_log_streams()
            .set_log_group_name(Some(group.to_string()))
            .set_log_stream_name_prefix(Some(prefix.to_string()))
            .send()
            .await
            .map_err(|e| LogsApiError::new("DescribeLogStreams", format!("{:?}", e)))?;
        Ok(output
            .log_streams()
            .unwrap_or_default()
            .iter()
            .filter_map(|stream| stream.log_stream_name().map(String::from))
            .collect())
    }

    async fn create_log_stream(&self, group: &str, name: &str) -> Result<(), LogsApiError> {
        self.client
            .create_log_stream()
            .set_log_group_name(Some(group.to_string()))
            .set_log_stream_name(Some(name.to_string()))
            .send()
            .await
            .map_err(|e| LogsApiError::new("CreateLogStream", format!("{:?}", e)))?;
        Ok(())
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
    ) -> Result<(), LogsApiError> {
        let events = events
            .into_iter()
            .map(|event| {
                InputLogEvent::builder()
                    .set_timestamp(Some(event.timestamp))
                    .set_message(Some(event.message))
                    .build()
            })
            .collect();
        let output = self
            .client
            .put_log_events()
            .set_log_group_name(Some(group.to_string()))
            .set_log_stream_name(Some(stream.to_string()))
            .set_log_events(Some(events))
            .send()
            .await
            .map_err(|e| LogsApiError::new("PutLogEvents", format!("{:?}", e)))?;
        if let Some(rejected) = output.rejected_log_events_info() {
            return Err(LogsApiError::new(
                "PutLogEvents",
                format!("events rejected: {:?}", rejected),
            ));
        }
        Ok(())
    }
}
