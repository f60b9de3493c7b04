use aws_config::meta::region::RegionProviderChain;
use aws_lambda_events::event::s3::S3Event;
use aws_sdk_cloudwatchlogs as logs;
use aws_sdk_s3 as s3;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log_forwarder::config::Config;
use log_forwarder::logs_api::CloudWatchLogs;
use log_forwarder::objects::S3Objects;
use log_forwarder::{function_handler, LogService};
use std::env;
use tracing::info;

const TRACING_DEBUG: &str = "TRACING_DEBUG";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(match env::var(TRACING_DEBUG) {
            Ok(_) => tracing::Level::DEBUG,
            Err(_) => tracing::Level::INFO,
        })
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let config = Config::from_env()?;
    info!(
        "log group is {}, log stream prefix is {}",
        config.log_group_name, config.log_stream_prefix
    );

    let region_provider = RegionProviderChain::default_provider().or_else("eu-north-1");
    let aws_config = aws_config::from_env().region(region_provider).load().await;
    let objects = S3Objects::new(s3::Client::new(&aws_config));
    let service = LogService::new(CloudWatchLogs::new(logs::Client::new(&aws_config)), &config);

    run(service_fn(|event: LambdaEvent<S3Event>| {
        function_handler(&objects, &service, event)
    }))
    .await
}
