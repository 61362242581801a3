//! File management module for filevault.
//!
//! This module provides the file lifecycle:
//! - Blob storage with UUID naming and typed storage paths
//! - File metadata persistence and search
//! - Upload, listing, and share link issuance
//! - Background reclamation of expired files

mod metadata;
mod path;
mod service;
mod storage;
mod sweeper;

pub use metadata::{Expiry, FileRecord, FileRepository, NewFileRecord, SearchFilter};
pub use path::{PublicUrls, StoragePath};
pub use service::{FileService, Listing, UploadRequest, UploadResult};
pub use storage::FileStorage;
pub use sweeper::{SweepReport, Sweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL};

/// Maximum length for file description (in characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
