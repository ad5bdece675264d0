use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use secrecy::ExposeSecret;
use std::time::Duration;

use super::{
    default_name, key_from_url, validate_key_part, FileStorage, StorageError, StorageResult,
};
use crate::config::S3Config;

const DEFAULT_REGION: &str = "us-east-1";

/// S3-compatible object storage. Objects are public at `<endpoint>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3Storage {
    pub fn from_config(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.expose_secret().to_string(),
            None,
            None,
            "static",
        );
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .region(Region::new(region))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket_name.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn key_for(&self, url: &str) -> StorageResult<String> {
        let key = key_from_url(url, &format!("{}/", self.bucket));
        validate_key_part(&key)?;
        Ok(key)
    }
}

fn backend<E: std::fmt::Display>(err: E) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        filename: Option<&str>,
        content_type: &str,
    ) -> StorageResult<String> {
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| default_name(content_type));
        validate_key_part(folder)?;
        validate_key_part(&name)?;
        let key = format!("{folder}/{name}");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| backend(aws_sdk_s3::error::DisplayErrorContext(e)))?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Uploaded object");
        Ok(self.public_url(&key))
    }

    async fn delete(&self, url: &str) -> StorageResult<()> {
        let key = self.key_for(url)?;
        if !self.exists(url).await? {
            return Err(StorageError::NotFound(url.to_string()));
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| backend(aws_sdk_s3::error::DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn exists(&self, url: &str) -> StorageResult<bool> {
        let key = self.key_for(url)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(backend(aws_sdk_s3::error::DisplayErrorContext(err)))
                }
            }
        }
    }

    async fn signed_url(&self, url: &str, ttl: Duration) -> StorageResult<String> {
        let key = self.key_for(url)?;
        let presigning = PresigningConfig::expires_in(ttl).map_err(backend)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(presigning)
            .await
            .map_err(|e| backend(aws_sdk_s3::error::DisplayErrorContext(e)))?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn storage() -> S3Storage {
        S3Storage::from_config(&S3Config {
            endpoint: "https://s3.example.test/".into(),
            access_key_id: "key".into(),
            secret_access_key: SecretString::from("secret".to_string()),
            bucket_name: "coop-media".into(),
            region: None,
        })
    }

    #[test]
    fn public_urls_use_path_style() {
        assert_eq!(
            storage().public_url("cvs/cv_2210511.pdf"),
            "https://s3.example.test/coop-media/cvs/cv_2210511.pdf"
        );
    }

    #[test]
    fn keys_come_back_from_signed_and_plain_urls() {
        let s3 = storage();
        assert_eq!(
            s3.key_for(
                "https://s3.example.test/coop-media/letters/letter_1_PT.pdf?X-Amz-Expires=60"
            )
            .unwrap(),
            "letters/letter_1_PT.pdf"
        );
        assert!(s3.key_for("https://s3.example.test/coop-media/../x").is_err());
    }
}
