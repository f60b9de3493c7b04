use std::env;
use std::time::Duration;
use thiserror::Error;

const ORGANIZATION: &str = "ORGANIZATION";
const STAGE: &str = "STAGE";
const PRIMARY_AWS_REGION: &str = "PRIMARY_AWS_REGION";
const SNS_TOPIC_EMAIL_ARN: &str = "SNS_TOPIC_EMAIL_ARN";
const SNS_TOPIC_CHATBOT_ARN: &str = "SNS_TOPIC_CHATBOT_ARN";
const COOL_DOWN_SECONDS: &str = "COOL_DOWN_SECONDS";

pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variables are missing: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Environment as read at cold start. Required values are only checked per
/// event by [`Config::settings`], so a misconfigured function fails each
/// invocation instead of failing to boot.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub organization: Option<String>,
    pub stage: Option<String>,
    pub primary_region: Option<String>,
    pub email_topic_arn: Option<String>,
    pub chatbot_topic_arn: Option<String>,
    pub cool_down: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings<'a> {
    pub organization: &'a str,
    pub stage: &'a str,
    pub primary_region: &'a str,
    pub email_topic_arn: &'a str,
    pub chatbot_topic_arn: Option<&'a str>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let cool_down = match non_empty(COOL_DOWN_SECONDS) {
            Some(value) => Duration::from_secs(value.parse().map_err(|_| ConfigError::Invalid {
                name: COOL_DOWN_SECONDS,
                value,
            })?),
            None => DEFAULT_COOL_DOWN,
        };

        Ok(Config {
            organization: non_empty(ORGANIZATION),
            stage: non_empty(STAGE),
            primary_region: non_empty(PRIMARY_AWS_REGION),
            email_topic_arn: non_empty(SNS_TOPIC_EMAIL_ARN),
            chatbot_topic_arn: non_empty(SNS_TOPIC_CHATBOT_ARN),
            cool_down,
        })
    }

    pub fn settings(&self) -> Result<Settings<'_>, ConfigError> {
        match (
            self.organization.as_deref(),
            self.stage.as_deref(),
            self.primary_region.as_deref(),
            self.email_topic_arn.as_deref(),
        ) {
            (Some(organization), Some(stage), Some(primary_region), Some(email_topic_arn)) => Ok(Settings {
                organization,
                stage,
                primary_region,
                email_topic_arn,
                chatbot_topic_arn: self.chatbot_topic_arn.as_deref(),
            }),
            _ => {
                let missing = [
                    (ORGANIZATION, &self.organization),
                    (STAGE, &self.stage),
                    (PRIMARY_AWS_REGION, &self.primary_region),
                    (SNS_TOPIC_EMAIL_ARN, &self.email_topic_arn),
                ]
                .iter()
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| *name)
                .collect();
                Err(ConfigError::Missing(missing))
            }
        }
    }
}
