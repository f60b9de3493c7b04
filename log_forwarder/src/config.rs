use crate::batch::BatchLimits;
use std::env;
use thiserror::Error;

const LOG_GROUP_NAME: &str = "logGroupName";
const LOG_STREAM_NAME: &str = "logStreamName";
const MAX_BATCH_BYTES: &str = "MAX_BATCH_BYTES";
const MAX_BATCH_COUNT: &str = "MAX_BATCH_COUNT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_group_name: String,
    /// Middle segment of every stream name this function creates.
    pub log_stream_prefix: String,
    pub limits: BatchLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let limit = |name: &'static str, default: usize| match lookup(name) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::Invalid { name, value }),
            None => Ok(default),
        };

        let defaults = BatchLimits::default();
        Ok(Config {
            log_group_name: required(LOG_GROUP_NAME)?,
            log_stream_prefix: required(LOG_STREAM_NAME)?,
            limits: BatchLimits {
                max_bytes: limit(MAX_BATCH_BYTES, defaults.max_bytes)?,
                max_count: limit(MAX_BATCH_COUNT, defaults.max_count)?,
            },
        })
    }
}
