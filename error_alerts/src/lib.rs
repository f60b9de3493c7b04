pub mod config;
pub mod debounce;
pub mod envelope;
pub mod fanout;
pub mod message;

use config::{Config, ConfigError, Settings};
use debounce::SourceDebouncer;
use envelope::{decode_envelope, AlertEnvelope, EnvelopeError, SubscriptionEvent};
use fanout::{fan_out, FanoutError, Notification, Publisher};
use lambda_runtime::{Error, LambdaEvent};
use message::{AlertMessageBuilder, MessageError, Subject};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Fanout(#[from] FanoutError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Notified(Subject),
    /// Another alert from the same log group is being handled or cooling down.
    AlreadyHandling,
}

/// Turns error log subscription deliveries into SNS notifications, at most
/// one per log group per cool-down.
pub struct AlertHandler<P> {
    config: Config,
    publisher: P,
    debouncer: SourceDebouncer,
}

impl<P: Publisher> AlertHandler<P> {
    pub fn new(config: Config, publisher: P) -> Self {
        let debouncer = SourceDebouncer::in_memory(config.cool_down);
        Self::with_debouncer(config, publisher, debouncer)
    }

    pub fn with_debouncer(config: Config, publisher: P, debouncer: SourceDebouncer) -> Self {
        Self {
            config,
            publisher,
            debouncer,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn debouncer(&self) -> &SourceDebouncer {
        &self.debouncer
    }

    pub async fn handle(&self, event: SubscriptionEvent) -> Result<Outcome, AlertError> {
        info!("received event: {:?}", event);
        let settings = self.config.settings()?;
        let envelope = decode_envelope(&event.awslogs.data)?;
        let source = envelope.log_group.clone();

        if !self.debouncer.should_process(&source) {
            info!("already handling error for log group: {}", source);
            return Ok(Outcome::AlreadyHandling);
        }

        match self.notify(&settings, &envelope).await {
            Ok(subject) => {
                self.debouncer.release_after_cool_down(&source);
                Ok(Outcome::Notified(subject))
            }
            Err(e) => {
                // a retried delivery must not be swallowed by the failed attempt
                self.debouncer.release_now(&source);
                Err(e)
            }
        }
    }

    async fn notify(&self, settings: &Settings<'_>, envelope: &AlertEnvelope) -> Result<Subject, AlertError> {
        debug!("parsed: {:?}", envelope);
        let message = AlertMessageBuilder::new(settings.stage, settings.primary_region).build(envelope)?;
        debug!("message: {}", message.email_body);

        let subject = message.sns_subject();
        let mut notifications = vec![Notification {
            topic_arn: settings.email_topic_arn.to_string(),
            subject: subject.clone(),
            message: message.email_body.clone(),
        }];
        if let Some(chatbot_topic_arn) = settings.chatbot_topic_arn {
            notifications.push(Notification {
                topic_arn: chatbot_topic_arn.to_string(),
                subject,
                message: message.chatbot_json()?,
            });
        }

        fan_out(&self.publisher, &notifications).await?;
        info!(
            "sent {} alert for {} to {} topic(s)",
            message.subject,
            envelope.log_group,
            notifications.len()
        );
        Ok(message.subject)
    }
}

pub async fn function_handler<P: Publisher>(
    handler: &AlertHandler<P>,
    event: LambdaEvent<SubscriptionEvent>,
) -> Result<(), Error> {
    let outcome = handler.handle(event.payload).await?;
    debug!("outcome: {:?}", outcome);
    Ok(())
}
