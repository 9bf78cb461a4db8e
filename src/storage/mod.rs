//! Object storage contract: signed URL issuance and size lookups.
//!
//! The storage service itself is external. `HttpObjectStorage` talks to it
//! over plain HTTP; `InMemoryObjectStorage` stands in when the platform runs
//! in test mode.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage responded with status {0}")]
    UnexpectedStatus(u16),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn signed_upload_url(&self, key: &str, content_type: &str) -> Result<SignedUrl, StorageError>;

    fn signed_download_url(&self, key: &str) -> Result<SignedUrl, StorageError>;

    /// Size of a stored object, `None` when the object does not exist
    async fn object_size(&self, key: &str) -> Result<Option<i64>, StorageError>;
}

/// Build the storage backend the configuration asks for
pub fn from_config(config: &StorageConfig, test_mode: bool) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    if test_mode {
        tracing::info!("Using in-memory object storage (test mode)");
        return Ok(Arc::new(InMemoryObjectStorage::new(config.url_ttl_secs)));
    }
    Ok(Arc::new(HttpObjectStorage::new(config)?))
}

/// Keyed SHA-256 digest over the request parameters, hex encoded
pub fn sign(secret: &str, method: &str, key: &str, expires: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\n");
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(key.as_bytes());
    hasher.update(b"\n");
    hasher.update(expires.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct HttpObjectStorage {
    base: url::Url,
    bucket: String,
    secret: String,
    ttl: Duration,
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.signing_secret.is_empty() {
            return Err(StorageError::NotConfigured("STORAGE_SIGNING_SECRET"));
        }
        let base = url::Url::parse(&config.base_url).map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base,
            bucket: config.bucket.clone(),
            secret: config.signing_secret.clone(),
            ttl: Duration::seconds(config.url_ttl_secs as i64),
            client,
        })
    }

    fn object_url(&self, key: &str) -> Result<url::Url, StorageError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push(&self.bucket);
            for part in key.split('/') {
                segments.push(part);
            }
        }
        Ok(url)
    }

    fn signed(&self, method: &str, key: &str, extra: &[(&str, &str)]) -> Result<SignedUrl, StorageError> {
        let expires_at = Utc::now() + self.ttl;
        let expires = expires_at.timestamp();
        let signature = sign(&self.secret, method, key, expires);

        let mut url = self.object_url(key)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("expires", &expires.to_string());
            for (k, v) in extra {
                query.append_pair(k, v);
            }
            query.append_pair("signature", &signature);
        }

        Ok(SignedUrl {
            url: url.into(),
            method: method.to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    fn signed_upload_url(&self, key: &str, content_type: &str) -> Result<SignedUrl, StorageError> {
        self.signed("PUT", key, &[("content_type", content_type)])
    }

    fn signed_download_url(&self, key: &str) -> Result<SignedUrl, StorageError> {
        self.signed("GET", key, &[])
    }

    async fn object_size(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let signed = self.signed("HEAD", key, &[])?;
        let response = self.client.head(&signed.url).send().await?;

        match response.status().as_u16() {
            404 => Ok(None),
            200..=299 => Ok(response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())),
            other => Err(StorageError::UnexpectedStatus(other)),
        }
    }
}

/// Test-mode storage. Objects "exist" once `put_object` records their size.
pub struct InMemoryObjectStorage {
    ttl: Duration,
    objects: RwLock<HashMap<String, i64>>,
}

impl InMemoryObjectStorage {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn put_object(&self, key: &str, size: i64) {
        self.objects.write().await.insert(key.to_string(), size);
    }

    fn fake_url(&self, method: &str, key: &str) -> SignedUrl {
        let expires_at = Utc::now() + self.ttl;
        SignedUrl {
            url: format!("memory://objects/{}?expires={}", key, expires_at.timestamp()),
            method: method.to_string(),
            expires_at,
        }
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    fn signed_upload_url(&self, key: &str, _content_type: &str) -> Result<SignedUrl, StorageError> {
        Ok(self.fake_url("PUT", key))
    }

    fn signed_download_url(&self, key: &str) -> Result<SignedUrl, StorageError> {
        Ok(self.fake_url("GET", key))
    }

    async fn object_size(&self, key: &str) -> Result<Option<i64>, StorageError> {
        Ok(self.objects.read().await.get(key).copied())
    }
}

/// Object key for an upload: `<owner>/<file id>/<filename>` with the
/// filename reduced to a safe character set.
pub fn object_key(owner: uuid::Uuid, file_id: uuid::Uuid, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "file" } else { safe };
    format!("{}/{}/{}", owner, file_id, safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> StorageConfig {
        StorageConfig {
            base_url: base_url.to_string(),
            bucket: "edu-files".to_string(),
            signing_secret: "s3cret".to_string(),
            url_ttl_secs: 600,
            default_quota_bytes: 1000,
            max_upload_bytes: 100,
            allowed_content_types: vec!["text/plain".to_string()],
        }
    }

    #[test]
    fn signatures_depend_on_every_part() {
        let base = sign("k", "GET", "a/b", 10);
        assert_eq!(base.len(), 64);
        assert_ne!(base, sign("k", "PUT", "a/b", 10));
        assert_ne!(base, sign("k", "GET", "a/c", 10));
        assert_ne!(base, sign("k", "GET", "a/b", 11));
        assert_ne!(base, sign("j", "GET", "a/b", 10));
        assert_eq!(base, sign("k", "GET", "a/b", 10));
    }

    #[test]
    fn signed_urls_include_bucket_key_and_signature() {
        let storage = HttpObjectStorage::new(&config("https://files.example.com/")).unwrap();
        let signed = storage.signed_upload_url("owner/id/report.pdf", "application/pdf").unwrap();
        assert_eq!(signed.method, "PUT");
        assert!(signed.url.starts_with("https://files.example.com/edu-files/owner/id/report.pdf?expires="));
        assert!(signed.url.contains("content_type=application%2Fpdf"));
        assert!(signed.url.contains("signature="));
        assert!(signed.expires_at > Utc::now());
    }

    #[test]
    fn refuses_missing_secret() {
        let mut cfg = config("https://files.example.com");
        cfg.signing_secret.clear();
        assert!(matches!(HttpObjectStorage::new(&cfg), Err(StorageError::NotConfigured(_))));
    }

    #[test]
    fn object_keys_are_sanitised() {
        let owner = uuid::Uuid::nil();
        let id = uuid::Uuid::nil();
        let key = object_key(owner, id, "../my report (final).pdf");
        assert_eq!(
            key,
            "00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000/_my_report__final_.pdf"
        );
        assert_eq!(object_key(owner, id, "...").rsplit('/').next(), Some("file"));
    }

    #[tokio::test]
    async fn reads_object_size_from_head() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/edu-files/o/f/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1234]))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/edu-files/o/f/missing.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let storage = HttpObjectStorage::new(&config(&server.uri())).unwrap();
        assert_eq!(storage.object_size("o/f/a.txt").await.unwrap(), Some(1234));
        assert_eq!(storage.object_size("o/f/missing.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_storage_tracks_objects() {
        let storage = InMemoryObjectStorage::new(60);
        assert_eq!(storage.object_size("k").await.unwrap(), None);
        storage.put_object("k", 42).await;
        assert_eq!(storage.object_size("k").await.unwrap(), Some(42));
        assert!(storage.signed_download_url("k").unwrap().url.starts_with("memory://objects/k"));
    }
}
