//! Object storage for asset content, game data files and export results
//!
//! Keys are relative paths such as `assets/beaker.png` or
//! `jobs/<id>.csv`. The filesystem backend is served back under
//! `/objects`; the HTTP backend talks to an S3-compatible bucket endpoint
//! with plain PUT/GET requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use gg_common::config::{Settings, StorageBackend};
use gg_common::{Error, Result};
use tracing::debug;

/// URL prefix the filesystem backend is mounted at
pub const FS_MOUNT: &str = "/objects";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch an object; None when it does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Public URL clients use to download `key`
    fn public_url(&self, key: &str) -> String;

    /// Local directory to serve under [`FS_MOUNT`], if any
    fn local_root(&self) -> Option<&Path> {
        None
    }
}

/// Build the configured backend
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn ObjectStore>> {
    let public_base = settings.storage.public_base.clone();
    match settings.storage.backend {
        StorageBackend::Fs => Ok(Arc::new(FsStore::new(settings.storage_root(), public_base))),
        StorageBackend::Http => {
            let endpoint = settings.storage.endpoint.clone().ok_or_else(|| {
                Error::Config("storage.endpoint is required for the http backend".to_string())
            })?;
            Ok(Arc::new(HttpStore::new(endpoint, public_base)))
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        return Err(Error::Storage(format!("invalid object key '{}'", key)));
    }
    Ok(())
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Objects as files below a root directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    public_base: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, public_base: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.unwrap_or_else(|| FS_MOUNT.to_string()),
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        debug!(key, bytes = bytes.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base, key)
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// Objects in an S3-compatible bucket reachable over HTTP
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: String,
    public_base: String,
}

impl HttpStore {
    pub fn new(endpoint: String, public_base: Option<String>) -> Self {
        let public_base = public_base.unwrap_or_else(|| endpoint.clone());
        Self {
            client: reqwest::Client::new(),
            endpoint,
            public_base,
        }
    }
}

fn http_error(e: reqwest::Error) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        check_key(key)?;
        let len = bytes.len();
        self.client
            .put(join_url(&self.endpoint, key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;
        debug!(key, bytes = len, "Uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        let response = self
            .client
            .get(join_url(&self.endpoint, key))
            .send()
            .await
            .map_err(http_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response
            .error_for_status()
            .map_err(http_error)?
            .bytes()
            .await
            .map_err(http_error)?;
        Ok(Some(bytes.to_vec()))
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base, key)
    }
}
