use async_trait::async_trait;
use aws_sdk_sns as sns;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
#[error("publish to {topic_arn} failed: {message}")]
pub struct PublishError {
    pub topic_arn: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("{failed} of {attempted} notifications failed", failed = .failures.len())]
pub struct FanoutError {
    pub attempted: usize,
    /// Never empty.
    pub failures: Vec<PublishError>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<(), PublishError>;
}

pub struct SnsPublisher {
    client: sns::Client,
}

impl SnsPublisher {
    pub fn new(client: sns::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<(), PublishError> {
        let output = self
            .client
            .publish()
            .set_topic_arn(Some(topic_arn.to_string()))
            .set_subject(Some(subject.to_string()))
            .set_message(Some(message.to_string()))
            .send()
            .await
            .map_err(|e| PublishError {
                topic_arn: topic_arn.to_string(),
                message: format!("{:?}", e),
            })?;
        debug!("published {:?} to {}", output.message_id(), topic_arn);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic_arn: String,
    pub subject: String,
    pub message: String,
}

/// Publishes every notification at once and waits for all of them.
pub async fn fan_out(publisher: &dyn Publisher, notifications: &[Notification]) -> Result<(), FanoutError> {
    let results = join_all(
        notifications
            .iter()
            .map(|n| publisher.publish(&n.topic_arn, &n.subject, &n.message)),
    )
    .await;

    let failures: Vec<PublishError> = results.into_iter().filter_map(Result::err).collect();
    if failures.is_empty() {
        return Ok(());
    }
    for failure in &failures {
        error!("{}", failure);
    }
    Err(FanoutError {
        attempted: notifications.len(),
        failures,
    })
}
