//! Typed locations for stored blobs.
//!
//! A file record's `storage_path` column may hold one of three shapes:
//! a path relative to the upload directory (what uploads write today),
//! an absolute filesystem path, or an `http(s)` URL pointing at the
//! public upload prefix. [`StoragePath`] parses the column once and
//! offers explicit conversions to a local path and to a public URL.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::{Result, VaultError};

/// Location of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePath {
    /// Relative to the upload directory.
    Relative(PathBuf),
    /// Absolute filesystem path, used as-is.
    Absolute(PathBuf),
    /// Public URL; the blob lives in the upload directory under its basename.
    Url(Url),
}

impl StoragePath {
    /// Parse a stored `storage_path` value.
    pub fn parse(raw: &str) -> Self {
        if let Ok(url) = Url::parse(raw) {
            if matches!(url.scheme(), "http" | "https") {
                return StoragePath::Url(url);
            }
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            StoragePath::Absolute(path.to_path_buf())
        } else {
            StoragePath::Relative(path.to_path_buf())
        }
    }

    /// Path relative to the upload directory for a freshly stored blob.
    pub fn relative(stored_name: impl Into<PathBuf>) -> Self {
        StoragePath::Relative(stored_name.into())
    }

    /// Final path component of the location.
    pub fn basename(&self) -> Option<String> {
        match self {
            StoragePath::Relative(p) | StoragePath::Absolute(p) => p
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_string()),
            StoragePath::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        }
    }

    /// Resolve to a filesystem path.
    ///
    /// URLs map to their basename under `upload_dir`. Relative paths are
    /// joined under `upload_dir` with `..` and root components dropped, so
    /// they can never escape it. Absolute paths are returned unchanged.
    pub fn to_local_path(&self, upload_dir: &Path) -> Result<PathBuf> {
        match self {
            StoragePath::Absolute(p) => Ok(p.clone()),
            StoragePath::Relative(p) => {
                let cleaned: PathBuf = p
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part),
                        _ => None,
                    })
                    .collect();
                if cleaned.as_os_str().is_empty() {
                    return Err(VaultError::StorageFailure(format!(
                        "empty storage path: {}",
                        p.display()
                    )));
                }
                Ok(upload_dir.join(cleaned))
            }
            StoragePath::Url(url) => {
                let name = self.basename().ok_or_else(|| {
                    VaultError::StorageFailure(format!("URL has no file name: {url}"))
                })?;
                Ok(upload_dir.join(name))
            }
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePath::Relative(p) | StoragePath::Absolute(p) => {
                write!(f, "{}", p.to_string_lossy().replace('\\', "/"))
            }
            StoragePath::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Builds public URLs for stored blobs.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base: String,
    prefix: String,
}

impl PublicUrls {
    /// Create a builder from a base URL (`http://host:port`) and the path
    /// prefix the upload directory is served under (`/uploads`).
    pub fn new(base_url: &str, prefix: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| VaultError::Config(format!("invalid public_base_url {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VaultError::Config(format!(
                "public_base_url must be http or https: {base_url}"
            )));
        }

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    /// Public URL for a storage location.
    ///
    /// URLs are returned unchanged. Filesystem paths are served by basename
    /// for absolute paths and by their relative path otherwise.
    pub fn url_for(&self, path: &StoragePath) -> String {
        let tail = match path {
            StoragePath::Url(url) => return url.to_string(),
            StoragePath::Relative(_) => path.to_string(),
            StoragePath::Absolute(_) => path.basename().unwrap_or_default(),
        };
        let tail = tail.trim_start_matches('/');

        if self.prefix.is_empty() {
            format!("{}/{}", self.base, tail)
        } else {
            format!("{}/{}/{}", self.base, self.prefix, tail)
        }
    }
}
