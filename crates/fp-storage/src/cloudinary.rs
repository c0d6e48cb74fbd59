//! Signed direct-upload parameters for Cloudinary.

use serde::Serialize;
use sha1::{Digest, Sha1};

use fp_config::secrets::CloudinaryCredentials;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    pub timestamp: i64,
    pub signature: String,
    pub cloud_name: String,
    pub api_key: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct CloudinarySigner {
    creds: CloudinaryCredentials,
}

impl CloudinarySigner {
    pub fn new(creds: CloudinaryCredentials) -> Self {
        Self { creds }
    }

    /// Parameters are sorted by name and joined as `k=v&k=v`, then the
    /// api secret is appended and the whole string is SHA-1 hashed.
    pub fn sign(&self, folder: &str, timestamp: i64) -> UploadSignature {
        let mut params = [("folder", folder.to_string()), ("timestamp", timestamp.to_string())];
        params.sort_by(|a, b| a.0.cmp(b.0));
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.creds.api_secret.as_bytes());

        UploadSignature {
            timestamp,
            signature: hex::encode(hasher.finalize()),
            cloud_name: self.creds.cloud_name.clone(),
            api_key: self.creds.api_key.clone(),
            folder: folder.to_string(),
        }
    }
}
