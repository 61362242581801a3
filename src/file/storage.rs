//! Blob storage for filevault.
//!
//! Uploaded bytes are written flat into the upload directory under a
//! UUID-based name that keeps the original extension:
//! ```text
//! {upload_dir}/
//! ├── 3f2b1c9e-5d4a-4e8f-9a7b-1c2d3e4f5a6b.txt
//! └── 9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d.pdf
//! ```
//! The flat layout lets the directory be served directly at the public
//! upload prefix.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::path::StoragePath;
use crate::{Result, VaultError};

/// Extension used when the original filename has none.
const DEFAULT_EXTENSION: &str = "bin";

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            VaultError::StorageFailure(format!(
                "cannot create upload directory {}: {e}",
                base_path.display()
            ))
        })?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a new UUID-based name.
    ///
    /// Returns the location of the new blob relative to the upload directory.
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<StoragePath> {
        let stored_name = Self::generate_stored_name(original_name);
        let file_path = self.base_path.join(&stored_name);

        tokio::fs::write(&file_path, content).await.map_err(|e| {
            VaultError::StorageFailure(format!("write {}: {e}", file_path.display()))
        })?;

        Ok(StoragePath::relative(stored_name))
    }

    /// Load a blob's content.
    pub async fn load(&self, path: &StoragePath) -> Result<Vec<u8>> {
        let file_path = self.resolve(path)?;

        match tokio::fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("blob {path}")))
            }
            Err(e) => Err(VaultError::StorageFailure(format!(
                "read {}: {e}",
                file_path.display()
            ))),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn delete(&self, path: &StoragePath) -> Result<bool> {
        let file_path = self.resolve(path)?;

        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::StorageFailure(format!(
                "delete {}: {e}",
                file_path.display()
            ))),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, path: &StoragePath) -> bool {
        match self.resolve(path) {
            Ok(file_path) => tokio::fs::try_exists(&file_path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Resolve a storage location to a filesystem path.
    pub fn resolve(&self, path: &StoragePath) -> Result<PathBuf> {
        path.to_local_path(&self.base_path)
    }

    /// Extract the file extension from a filename.
    ///
    /// Returns `None` when there is no extension or it contains anything
    /// other than ASCII alphanumerics.
    pub fn extract_extension(filename: &str) -> Option<&str> {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// File type recorded for an upload: the extension with a leading dot,
    /// or an empty string.
    pub fn file_type(filename: &str) -> String {
        Self::extract_extension(filename)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    /// Generate a new UUID-based stored name with the given extension.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name).unwrap_or(DEFAULT_EXTENSION);
        format!("{uuid}.{ext}")
    }
}
