use async_trait::async_trait;
use aws_lambda_events::event::s3::S3Event;
use flate2::write::GzEncoder;
use flate2::Compression;
use lambda_runtime::{Error, LambdaEvent};
use log_forwarder::batch::{BatchLimits, LogEvent};
use log_forwarder::config::Config;
use log_forwarder::logs_api::{LogsApi, LogsApiError};
use log_forwarder::objects::ObjectSource;
use log_forwarder::{function_handler, LogService};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

const ACCESS_LOG: &str = "#Version: 1.0\n\
    #Fields: date time x-edge-location cs-uri-stem\n\
    2024-03-01\t12:00:09\tHEL51-P1\t/codesets/a\n\
    2024-03-01\t12:00:01\tHEL51-P1\t/codesets/b\n\
    2024-03-01\t12:00:05\tARN1-C1\t/codesets/c\n";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn s3_event(keys: &[&str]) -> LambdaEvent<S3Event> {
    let records: Vec<serde_json::Value> = keys
        .iter()
        .map(|key| {
            serde_json::json!({
                "eventVersion": "2.0",
                "eventSource": "aws:s3",
                "awsRegion": "eu-north-1",
                "eventTime": "1970-01-01T00:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {
                    "x-amz-request-id": "EXAMPLE123456789",
                    "x-amz-id-2": "EXAMPLE123/5678abcdefghijklambdaisawesome/mnopqrstuvwxyzABCDEFGH"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "testConfigRule",
                    "bucket": {
                        "name": "standard-logs",
                        "ownerIdentity": { "principalId": "EXAMPLE" },
                        "arn": "arn:aws:s3:::standard-logs"
                    },
                    "object": {
                        "key": key,
                        "size": 1024,
                        "eTag": "0123456789abcdef0123456789abcdef",
                        "sequencer": "0A1B2C3D4E5F678901"
                    }
                }
            })
        })
        .collect();
    let payload: S3Event = serde_json::from_value(serde_json::json!({ "Records": records })).unwrap();
    LambdaEvent {
        payload,
        context: Default::default(),
    }
}

#[derive(Default)]
struct FakeObjects {
    objects: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl ObjectSource for FakeObjects {
    async fn content_type(&self, _bucket: &str, key: &str) -> Result<Option<String>, Error> {
        if self.objects.contains_key(key) {
            Ok(Some("application/x-gzip".to_string()))
        } else {
            Err(Error::from(format!("NoSuchKey: {}", key)))
        }
    }

    async fn fetch(&self, _bucket: &str, key: &str) -> Result<Vec<u8>, Error> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::from(format!("NoSuchKey: {}", key)))
    }
}

#[derive(Default)]
struct FakeLogs {
    groups: Mutex<Vec<String>>,
    streams: Mutex<Vec<String>>,
    puts: Mutex<Vec<(String, Vec<LogEvent>)>>,
}

#[async_trait]
impl LogsApi for FakeLogs {
    async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<String>, LogsApiError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_log_group(&self, name: &str) -> Result<(), LogsApiError> {
        self.groups.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn describe_log_streams(&self, _group: &str, prefix: &str) -> Result<Vec<String>, LogsApiError> {
        Ok(self
            .streams
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_log_stream(&self, _group: &str, name: &str) -> Result<(), LogsApiError> {
        self.streams.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn put_log_events(&self, _group: &str, stream: &str, events: Vec<LogEvent>) -> Result<(), LogsApiError> {
        self.puts.lock().unwrap().push((stream.to_string(), events));
        Ok(())
    }
}

fn config() -> Config {
    Config {
        log_group_name: "/aws/cloudfront/forwarder-dev".to_string(),
        log_stream_prefix: "forwarder-log-stream-dev".to_string(),
        limits: BatchLimits::default(),
    }
}

#[tokio::test]
async fn forwards_an_access_log_object() {
    let objects = FakeObjects {
        objects: HashMap::from([("logs/E2.2024-03-01-12.gz".to_string(), gzip(ACCESS_LOG.as_bytes()))]),
    };
    let service = LogService::new(FakeLogs::default(), &config());

    function_handler(&objects, &service, s3_event(&["logs/E2.2024-03-01-12.gz"]))
        .await
        .unwrap();

    let logs = service.api();
    assert_eq!(*logs.groups.lock().unwrap(), vec!["/aws/cloudfront/forwarder-dev".to_string()]);
    let streams = logs.streams.lock().unwrap();
    assert_eq!(streams.len(), 1);
    assert!(streams[0].contains("/forwarder-log-stream-dev/"));

    let puts = logs.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    let (stream, events) = &puts[0];
    assert_eq!(stream, &streams[0]);
    assert_eq!(events.len(), 3);
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    let first: serde_json::Value = serde_json::from_str(&events[0].message).unwrap();
    assert_eq!(first["timestamp"], "2024-03-01T12:00:01");
    assert_eq!(first["cs-uri-stem"], "/codesets/b");
    assert!(first.get("date").is_none());
}

#[tokio::test]
async fn missing_object_fails_the_invocation() {
    let objects = FakeObjects::default();
    let service = LogService::new(FakeLogs::default(), &config());

    let result = function_handler(&objects, &service, s3_event(&["logs/missing.gz"])).await;
    assert!(result.is_err());
    assert!(service.api().puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bad_object_does_not_block_the_next_one() {
    let malformed = "#Version: 1.0\n#Fields: date time\n2024-03-01\n";
    let objects = FakeObjects {
        objects: HashMap::from([
            ("logs/bad.gz".to_string(), gzip(malformed.as_bytes())),
            ("logs/good.gz".to_string(), gzip(ACCESS_LOG.as_bytes())),
        ]),
    };
    let service = LogService::new(FakeLogs::default(), &config());

    let result = function_handler(&objects, &service, s3_event(&["logs/bad.gz", "logs/good.gz"])).await;
    assert!(result.is_err());
    assert_eq!(service.api().puts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn corrupted_gzip_fails_cleanly() {
    let mut compressed = gzip(ACCESS_LOG.as_bytes());
    compressed[0] = b'x';
    compressed[1] = b'y';
    let objects = FakeObjects {
        objects: HashMap::from([("logs/corrupt.gz".to_string(), compressed)]),
    };
    let service = LogService::new(FakeLogs::default(), &config());

    // either nothing to send or a parse error, but never a panic
    let result = function_handler(&objects, &service, s3_event(&["logs/corrupt.gz"])).await;
    if result.is_ok() {
        let puts = service.api().puts.lock().unwrap();
        assert!(puts.iter().all(|(_, events)| events.is_empty()));
    }
}
