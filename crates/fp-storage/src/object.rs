//! `object_store` backed storage: local filesystem, S3, or in-memory.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, ObjectStoreExt, PutPayload};
use tracing::info;

use crate::{check_key, object_key, PutOptions, StorageError, StorageProvider, StoredObject};

pub struct ObjectStorage {
    inner: Arc<dyn ObjectStore>,
    name: &'static str,
    /// Prefix joined with the key to form public URLs.
    url_base: String,
    /// LocalFileSystem rejects object attributes; S3 stores them.
    send_content_type: bool,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("name", &self.name)
            .field("url_base", &self.url_base)
            .finish()
    }
}

impl ObjectStorage {
    /// Files under `dir`, served by the web tier at `public_base`.
    pub fn local(dir: &str, public_base: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create upload dir {dir}"))?;
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir)
            .with_context(|| format!("failed to open upload dir {dir}"))?;
        Ok(Self {
            inner: Arc::new(fs),
            name: "local",
            url_base: public_base.trim_end_matches('/').to_string(),
            send_content_type: false,
        })
    }

    /// Credentials come from the AWS_* environment.
    pub fn s3(bucket: &str, region: &str, cdn_domain: Option<&str>) -> Result<Self> {
        let store = object_store::aws::AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_allow_http(false)
            .build()
            .context("failed to create S3 client")?;
        Ok(Self {
            inner: Arc::new(store),
            name: "s3",
            url_base: s3_url_base(bucket, region, cdn_domain),
            send_content_type: true,
        })
    }

    pub fn memory(url_base: &str) -> Self {
        Self {
            inner: Arc::new(object_store::memory::InMemory::new()),
            name: "memory",
            url_base: url_base.trim_end_matches('/').to_string(),
            send_content_type: true,
        }
    }

    /// Raw bytes for a stored key.
    pub async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = to_path(key)?;
        let got = self.inner.get(&path).await?;
        Ok(got.bytes().await?)
    }
}

pub(crate) fn s3_url_base(bucket: &str, region: &str, cdn_domain: Option<&str>) -> String {
    match cdn_domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(cdn) => {
            let host = cdn
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            format!("https://{host}")
        }
        None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
    }
}

fn to_path(key: &str) -> Result<ObjectPath, StorageError> {
    check_key(key)?;
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
}

#[async_trait::async_trait]
impl StorageProvider for ObjectStorage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn put(&self, bytes: Bytes, opts: PutOptions) -> Result<StoredObject, StorageError> {
        let key = object_key(&opts)?;
        let path = to_path(&key)?;

        let mut put_opts = object_store::PutOptions::default();
        if self.send_content_type {
            if let Some(ct) = opts.content_type.clone() {
                let mut attrs = Attributes::new();
                attrs.insert(Attribute::ContentType, ct.into());
                put_opts.attributes = attrs;
            }
        }

        let size = bytes.len();
        self.inner
            .put_opts(&path, PutPayload::from_bytes(bytes), put_opts)
            .await?;

        info!(backend = self.name, key = %key, size, "object stored");
        Ok(StoredObject {
            url: self.url(&key),
            key,
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.url_base, key.trim_start_matches('/'))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = to_path(key)?;
        self.inner.delete(&path).await?;
        Ok(())
    }
}
