use async_trait::async_trait;
use aws_sdk_s3 as s3;
use lambda_runtime::Error;

/// Where the access-log objects are read from.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>, Error>;

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Error>;
}

pub struct S3Objects {
    client: s3::Client,
}

impl S3Objects {
    pub fn new(client: s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectSource for S3Objects {
    async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>, Error> {
        let metadata = self.client.head_object().bucket(bucket).key(key).send().await?;
        Ok(metadata.content_type().map(String::from))
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Error> {
        let object = self.client.get_object().bucket(bucket).key(key).send().await?;
        let body = object.body.collect().await?;
        Ok(body.into_bytes().to_vec())
    }
}
