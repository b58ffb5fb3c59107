//! Local filesystem storage backend.

use super::{StorageBackend, StorageError};
use crate::app_config::StorageConfig;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use url::Url;

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path for file storage
    base_path: PathBuf,
    /// URL the base path is served under, always ending in `/`
    public_base: Url,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf, public_url: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;

        let mut public_base = Url::parse(public_url)?;
        if !public_base.path().ends_with('/') {
            let path = format!("{}/", public_base.path());
            public_base.set_path(&path);
        }

        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self {
            base_path,
            public_base,
        })
    }

    /// Local storage rooted at the configured upload directory.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(PathBuf::from(&config.local_path), &config.public_url)
    }

    /// Relative key for a file, including prefix directories.
    fn prefixed_key(filename: &str) -> String {
        if filename.len() < 4 || !filename.is_char_boundary(2) || !filename.is_char_boundary(4) {
            // Fallback for short filenames
            filename.to_string()
        } else {
            format!("{}/{}/{}", &filename[0..2], &filename[2..4], filename)
        }
    }

    fn get_file_path(&self, filename: &str) -> PathBuf {
        self.base_path.join(Self::prefixed_key(filename))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: put_object: {:?}", path);

        actix_rt::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, data)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        Ok(())
    }

    async fn delete_object(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: delete_object: {:?}", path);

        let result = actix_rt::task::spawn_blocking(move || fs::remove_file(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.get_file_path(filename);
        Ok(path.exists())
    }

    fn public_url(&self, filename: &str) -> Result<String, StorageError> {
        Ok(self
            .public_base
            .join(&Self::prefixed_key(filename))?
            .to_string())
    }
}
