// src/store/s3.rs

//! S3-compatible object store (AWS S3, Cloudflare R2, MinIO)
//!
//! `rust-s3` is async; the publish engine is strictly sequential, so the
//! store owns a current-thread runtime and blocks on each request.

use super::{ObjectStore, WriteOptions};
use crate::error::{Error, Result};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use serde::Deserialize;
use tracing::debug;

/// Connection settings for an S3 bucket
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for non-AWS services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix prepended to every object
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    /// Explicit credentials; when absent the usual AWS environment
    /// variables, profile and instance metadata are consulted
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Object store backed by an S3 bucket
pub struct S3Store {
    bucket: Box<Bucket>,
    prefix: Option<String>,
    runtime: tokio::runtime::Runtime,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.region.parse().map_err(|e| {
                Error::ConfigError(format!("invalid region '{}': {}", config.region, e))
            })?,
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| Error::ConfigError(format!("failed to load S3 credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| Error::ConfigError(format!("invalid bucket '{}': {}", config.bucket, e)))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::IoError(format!("failed to start S3 runtime: {}", e)))?;

        let prefix = config
            .prefix
            .as_deref()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            bucket,
            prefix,
            runtime,
        })
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// ETag of an existing object, `None` when it does not exist
    fn etag(&self, key: &str) -> Result<Option<String>> {
        match self.runtime.block_on(self.bucket.head_object(key)) {
            Ok((head, 200)) => Ok(Some(
                head.e_tag.unwrap_or_default().trim_matches('"').to_string(),
            )),
            Ok((_, 404)) | Err(S3Error::HttpFailWithBody(404, _)) => Ok(None),
            Ok((_, code)) => Err(Error::StoreError(format!("HEAD {} returned HTTP {}", key, code))),
            Err(e) => Err(Error::StoreError(format!("HEAD {} failed: {}", key, e))),
        }
    }
}

impl ObjectStore for S3Store {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = self.full_key(key);
        match self.runtime.block_on(self.bucket.get_object(&key)) {
            Ok(resp) if resp.status_code() == 404 => Ok(None),
            Ok(resp) if (200..300).contains(&resp.status_code()) => Ok(Some(resp.bytes().to_vec())),
            Ok(resp) => Err(Error::StoreError(format!(
                "GET {} returned HTTP {}",
                key,
                resp.status_code()
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(None),
            Err(e) => Err(Error::StoreError(format!("GET {} failed: {}", key, e))),
        }
    }

    fn write(&self, key: &str, data: &[u8], options: &WriteOptions<'_>) -> Result<()> {
        let key = self.full_key(key);

        if options.fail_if_exists
            && let Some(etag) = self.etag(&key)?
        {
            // Single-part uploads carry the MD5 of the body as ETag
            let md5 = crate::hash::hash_bytes(crate::hash::HashAlgorithm::Md5, data);
            if etag == md5 {
                debug!(
                    "s3://{}/{} already present with identical content",
                    self.bucket.name(),
                    key
                );
                return Ok(());
            }
            return Err(Error::ConflictError(format!(
                "object {} already exists with different content",
                key
            )));
        }

        let mut bucket = self.bucket.clone();
        bucket.add_header("x-amz-acl", options.visibility.canned_acl());
        if let Some(cache_control) = options.cache_control {
            bucket.add_header("Cache-Control", cache_control);
        }

        let resp = self
            .runtime
            .block_on(bucket.put_object_with_content_type(&key, data, options.content_type))
            .map_err(|e| Error::StoreError(format!("PUT {} failed: {}", key, e)))?;
        if !(200..300).contains(&resp.status_code()) {
            return Err(Error::StoreError(format!(
                "PUT {} returned HTTP {}",
                key,
                resp.status_code()
            )));
        }

        debug!(
            "Stored s3://{}/{} ({} bytes, {})",
            self.bucket.name(),
            key,
            data.len(),
            options.content_type
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let key = self.full_key(key);
        match self.runtime.block_on(self.bucket.delete_object(&key)) {
            Ok(resp) if (200..300).contains(&resp.status_code()) || resp.status_code() == 404 => {
                debug!("Removed s3://{}/{}", self.bucket.name(), key);
                Ok(())
            }
            Ok(resp) => Err(Error::StoreError(format!(
                "DELETE {} returned HTTP {}",
                key,
                resp.status_code()
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(()),
            Err(e) => Err(Error::StoreError(format!("DELETE {} failed: {}", key, e))),
        }
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
