pub mod batch;
pub mod config;
pub mod decoder;
pub mod logs_api;
pub mod objects;
pub mod provision;
pub mod record;
pub mod upload;

use aws_lambda_events::event::s3::S3Event;
use batch::{plan_batches, BatchLimits, PlanError};
use config::Config;
use decoder::ParseError;
use lambda_runtime::{Error, LambdaEvent};
use logs_api::LogsApi;
use objects::ObjectSource;
use provision::{LogGroupProvisioner, LogStreamProvisioner};
use record::LogRecord;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use upload::{send_batches, UploadReport};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Ships parsed access-log records into a CloudWatch Logs group, one new
/// stream per call.
pub struct LogService<A> {
    api: A,
    groups: LogGroupProvisioner,
    streams: LogStreamProvisioner,
    limits: BatchLimits,
}

impl<A: LogsApi> LogService<A> {
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            groups: LogGroupProvisioner::new(&config.log_group_name),
            streams: LogStreamProvisioner::new(&config.log_group_name, &config.log_stream_prefix),
            limits: config.limits,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn process_logs(&self, records: Vec<LogRecord>) -> Result<UploadReport, PlanError> {
        let batches = plan_batches(records, self.limits)?;
        let group = self.groups.ensure(&self.api).await.into_name();
        let stream = self.streams.ensure(&self.api).await.into_name();
        Ok(send_batches(&self.api, batches, &group, &stream).await)
    }

    pub async fn process_object(&self, compressed: &[u8]) -> Result<UploadReport, ForwardError> {
        let records = decoder::decode(compressed)?;
        debug!("file processing completed, number of processed log lines is: {}", records.len());
        Ok(self.process_logs(records).await?)
    }
}

/// Forwards every object named in an S3 notification.
///
/// Not being able to read an object fails the invocation straight away. An
/// object that reads fine but cannot be decoded is logged and skipped so the
/// other objects still get forwarded; the first such error is returned at
/// the end.
pub async fn function_handler<S, A>(
    objects: &S,
    service: &LogService<A>,
    event: LambdaEvent<S3Event>,
) -> Result<(), Error>
where
    S: ObjectSource,
    A: LogsApi,
{
    info!("running log forwarder");
    debug!("event records count: {}", event.payload.records.len());

    let mut first_failure: Option<ForwardError> = None;
    for record in event.payload.records {
        let (bucket, key) = match (record.s3.bucket.name, record.s3.object.key) {
            (Some(bucket), Some(key)) => (bucket, key),
            (bucket, key) => {
                warn!("skipping record without bucket or key: {:?} {:?}", bucket, key);
                continue;
            }
        };
        debug!("event record: object {} from bucket {}", key, bucket);

        let body = match read_object(objects, &bucket, &key).await {
            Ok(body) => body,
            Err(e) => {
                error!(
                    "error processing logs from object {} in bucket {}. Make sure they exist and \
                     your bucket is in the same region as this function.",
                    key, bucket
                );
                error!("{}", e);
                return Err(e);
            }
        };

        match service.process_object(&body).await {
            Ok(report) => debug!("object {} forwarded: {:?}", key, report),
            Err(e) => {
                error!("failed to forward object {}: {}", key, e);
                first_failure.get_or_insert(e);
            }
        }
        info!("function execution complete for {}", key);
    }

    match first_failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn read_object<S: ObjectSource>(objects: &S, bucket: &str, key: &str) -> Result<Vec<u8>, Error> {
    let content_type = objects.content_type(bucket, key).await?;
    debug!("S3 object content type is: {:?}", content_type);
    let body = objects.fetch(bucket, key).await?;
    debug!("response stream length is {}", body.len());
    Ok(body)
}
