//! Image storage for uploads.
//!
//! One [`StorageProvider`] is active per process, chosen by
//! `storage.provider`. Keys are always `<folder>/<name>` and never escape
//! the configured root.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use uuid::Uuid;

use fp_config::settings::StorageSettings;

pub mod cloudinary;
mod object;

pub use cloudinary::{CloudinarySigner, UploadSignature};
pub use object::ObjectStorage;

pub const DEFAULT_FOLDER: &str = "general";
pub const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub folder: Option<String>,
    /// Explicit object name; a uuid with an extension from the content
    /// type is generated when absent.
    pub key: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<object_store::Error> for StorageError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put(&self, bytes: Bytes, opts: PutOptions) -> Result<StoredObject, StorageError>;

    /// Public URL for a key. Does not check existence.
    fn url(&self, key: &str) -> String;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// `image/png` → `png`; `image/svg+xml` → `svg`. Falls back to `jpg`.
pub fn extension_for(content_type: Option<&str>) -> String {
    let sub = content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|ct| ct.trim().split_once('/'))
        .map(|(_, sub)| sub.split('+').next().unwrap_or(sub).to_ascii_lowercase());

    match sub.as_deref() {
        Some("jpeg") => "jpg".to_string(),
        Some(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => s.to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("image/")
        .is_some_and(|sub| !sub.is_empty())
}

fn check_segment(part: &str) -> Result<(), StorageError> {
    let ok = !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains('\\')
        && !part.chars().any(char::is_control);
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(part.to_string()))
    }
}

/// Build `<folder>/<name>`. Folder defaults to `general`; nested folders
/// are allowed, traversal and absolute paths are not.
pub fn object_key(opts: &PutOptions) -> Result<String, StorageError> {
    let folder = opts
        .folder
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FOLDER);
    if folder.starts_with('/') {
        return Err(StorageError::InvalidKey(folder.to_string()));
    }
    for part in folder.trim_end_matches('/').split('/') {
        check_segment(part)?;
    }

    let name = match opts.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => {
            if k.contains('/') {
                return Err(StorageError::InvalidKey(k.to_string()));
            }
            check_segment(k)?;
            k.to_string()
        }
        None => format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for(opts.content_type.as_deref())
        ),
    };

    Ok(format!("{}/{}", folder.trim_end_matches('/'), name))
}

/// Validate a caller supplied key before a delete or URL lookup.
pub fn check_key(key: &str) -> Result<(), StorageError> {
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    key.split('/').try_for_each(check_segment)
}

/// Build the configured backend.
pub fn build_storage(settings: &StorageSettings) -> Result<Arc<dyn StorageProvider>> {
    match settings.provider.as_str() {
        "local" => {
            let store = ObjectStorage::local(&settings.upload_dir, &settings.public_base)
                .with_context(|| format!("local storage at {}", settings.upload_dir))?;
            Ok(Arc::new(store))
        }
        "s3" => {
            if settings.s3.bucket.trim().is_empty() {
                bail!("storage.s3.bucket is required when storage.provider=s3");
            }
            let store = ObjectStorage::s3(
                &settings.s3.bucket,
                &settings.s3.region,
                settings.s3.cdn_domain.as_deref(),
            )?;
            Ok(Arc::new(store))
        }
        other => bail!("unknown storage.provider '{}'; expected local | s3", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_content_type() {
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(Some("image/svg+xml")), "svg");
        assert_eq!(extension_for(Some("image/webp; charset=binary")), "webp");
        assert_eq!(extension_for(Some("garbage")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[test]
    fn key_defaults_to_general_folder() {
        let key = object_key(&PutOptions {
            content_type: Some("image/png".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(key.starts_with("general/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn explicit_key_and_nested_folder() {
        let key = object_key(&PutOptions {
            folder: Some("ads/designs/".into()),
            key: Some("banner.webp".into()),
            content_type: None,
        })
        .unwrap();
        assert_eq!(key, "ads/designs/banner.webp");
    }

    #[test]
    fn traversal_is_rejected() {
        for (folder, key) in [
            (Some("../etc"), None),
            (Some("/abs"), None),
            (Some("a/../../b"), None),
            (None, Some("../passwd")),
            (None, Some("x/y.png")),
            (Some("a\\b"), None),
        ] {
            let opts = PutOptions {
                folder: folder.map(String::from),
                key: key.map(String::from),
                content_type: None,
            };
            assert!(
                matches!(object_key(&opts), Err(StorageError::InvalidKey(_))),
                "{folder:?} {key:?}"
            );
        }
    }

    #[test]
    fn only_images_allowed() {
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("IMAGE/JPEG"));
        assert!(!is_allowed_content_type("image/"));
        assert!(!is_allowed_content_type("application/pdf"));
        assert!(!is_allowed_content_type("text/html"));
    }

    #[test]
    fn check_key_rules() {
        assert!(check_key("general/a.png").is_ok());
        assert!(check_key("../a.png").is_err());
        assert!(check_key("/general/a.png").is_err());
        assert!(check_key("general//a.png").is_err());
    }

    #[test]
    fn factory_rejects_unknown_and_bucketless_s3() {
        let mut s = StorageSettings {
            provider: "ftp".into(),
            ..Default::default()
        };
        assert!(build_storage(&s).is_err());

        s.provider = "s3".into();
        s.s3.bucket = String::new();
        let err = build_storage(&s).err().unwrap();
        assert!(err.to_string().contains("bucket"));
    }
}
