use aws_config::meta::region::RegionProviderChain;
use aws_sdk_sns as sns;
use error_alerts::config::Config;
use error_alerts::envelope::SubscriptionEvent;
use error_alerts::fanout::SnsPublisher;
use error_alerts::{function_handler, AlertHandler};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::env;

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

    // SNS topics live in the primary region, wherever the alarm came from
    let region_provider = match config.primary_region.clone() {
        Some(region) => RegionProviderChain::first_try(sns::Region::new(region)),
        None => RegionProviderChain::default_provider(),
    }
    .or_else("eu-north-1");
    let aws_config = aws_config::from_env().region(region_provider).load().await;
    let handler = AlertHandler::new(config, SnsPublisher::new(sns::Client::new(&aws_config)));

    run(service_fn(|event: LambdaEvent<SubscriptionEvent>| {
        function_handler(&handler, event)
    }))
    .await
}
