use crate::logs_api::{LogsApi, LogsApiError};
use chrono::{DateTime, Datelike, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provision {
    Existing,
    Created,
}

/// Outcome of an ensure-exists call.
///
/// The name is always present so the caller can carry on when creation
/// failed; CloudWatch Logs may still accept writes once the resource shows up.
#[derive(Debug)]
pub struct Provisioned {
    pub name: String,
    pub outcome: Result<Provision, LogsApiError>,
}

impl Provisioned {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

#[derive(Debug, Clone)]
pub struct LogGroupProvisioner {
    group_name: String,
}

impl LogGroupProvisioner {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
        }
    }

    pub async fn ensure(&self, api: &dyn LogsApi) -> Provisioned {
        let name = self.group_name.clone();
        match api.describe_log_groups(&name).await {
            Ok(groups) if !groups.is_empty() => {
                info!("success while describing log group: {}", name);
                return Provisioned {
                    name,
                    outcome: Ok(Provision::Existing),
                };
            }
            Ok(_) => info!("there are no existing log groups, creating log group {}", name),
            Err(e) => warn!("error while describing log group, creating log group {}: {}", name, e),
        }

        let outcome = match api.create_log_group(&name).await {
            Ok(()) => {
                info!("successfully created log group: {}", name);
                Ok(Provision::Created)
            }
            Err(e) => {
                error!("error while creating log group {}: {}", name, e);
                Err(e)
            }
        };
        Provisioned { name, outcome }
    }
}

/// Creates a fresh stream on every call, named
/// `{year}/{month}/{day}/{prefix}/{uuid}`.
#[derive(Debug, Clone)]
pub struct LogStreamProvisioner {
    group_name: String,
    stream_prefix: String,
}

impl LogStreamProvisioner {
    pub fn new(group_name: impl Into<String>, stream_prefix: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_prefix: stream_prefix.into(),
        }
    }

    pub fn stream_name(&self, now: DateTime<Utc>, id: Uuid) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            now.year(),
            now.month(),
            now.day(),
            self.stream_prefix,
            id
        )
    }

    pub async fn ensure(&self, api: &dyn LogsApi) -> Provisioned {
        let name = self.stream_name(Utc::now(), Uuid::new_v4());
        match api.describe_log_streams(&self.group_name, &name).await {
            Ok(streams) if !streams.is_empty() => {
                info!("log stream already defined: {}", name);
                return Provisioned {
                    name,
                    outcome: Ok(Provision::Existing),
                };
            }
            Ok(_) => info!("need to create log stream {}", name),
            Err(e) => warn!("error while describing log stream {}: {}", name, e),
        }

        let outcome = match api.create_log_stream(&self.group_name, &name).await {
            Ok(()) => {
                info!("success in creating log stream: {}", name);
                Ok(Provision::Created)
            }
            Err(e) => {
                error!("error while creating log stream {}: {}", name, e);
                Err(e)
            }
        };
        Provisioned { name, outcome }
    }
}
