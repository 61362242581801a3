//! File metadata types and repository for filevault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use utoipa::ToSchema;

use super::path::StoragePath;
use crate::datetime;
use crate::db::{DbBackend, DbPool};
use crate::{Result, VaultError};

/// When a file becomes eligible for reclamation.
///
/// Stored as SQL NULL for `Never`. Serialized as `null` or an RFC 3339
/// timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<DateTime<Utc>>", into = "Option<DateTime<Utc>>")]
pub enum Expiry {
    #[default]
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    /// Whether the expiry instant is strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => *at < now,
        }
    }

    fn to_db(self) -> Option<String> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(datetime::to_db(&at)),
        }
    }

    fn from_db(value: Option<&str>) -> Self {
        value
            .and_then(datetime::from_db)
            .map(Expiry::At)
            .unwrap_or(Expiry::Never)
    }
}

impl From<Option<DateTime<Utc>>> for Expiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(Expiry::At).unwrap_or(Expiry::Never)
    }
}

impl From<Expiry> for Option<DateTime<Utc>> {
    fn from(value: Expiry) -> Self {
        match value {
            Expiry::Never => None,
            Expiry::At(at) => Some(at),
        }
    }
}

/// Metadata for a stored file.
///
/// This is also the JSON shape returned by listing and search endpoints
/// and the value cached under the listing and metadata keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner_id: i64,
    /// Stored filename (UUID.ext format).
    pub file_name: String,
    #[serde(rename = "upload_date")]
    pub upload_time: DateTime<Utc>,
    #[serde(rename = "size")]
    pub size_bytes: i64,
    /// Blob location, relative to the upload directory for local uploads.
    #[serde(rename = "local_path")]
    pub storage_path: String,
    /// Original extension with its leading dot (e.g. `.txt`).
    pub file_type: String,
    /// URL of an externally hosted copy, empty for local uploads.
    #[serde(rename = "s3_url")]
    pub external_url: String,
    pub description: String,
    /// Set once a share link has been minted.
    pub is_shared: bool,
    #[serde(rename = "expiration_date")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub expires_at: Expiry,
}

impl FileRecord {
    /// Parsed blob location.
    pub fn location(&self) -> StoragePath {
        StoragePath::parse(&self.storage_path)
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: i64,
    pub file_name: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub file_type: String,
    pub description: String,
    pub expires_at: Expiry,
}

impl NewFileRecord {
    /// Create a new entry for a locally stored blob that never expires.
    pub fn new(owner_id: i64, location: &StoragePath, size_bytes: i64) -> Self {
        Self {
            owner_id,
            file_name: location.basename().unwrap_or_default(),
            size_bytes,
            storage_path: location.to_string(),
            file_type: String::new(),
            description: String::new(),
            expires_at: Expiry::Never,
        }
    }

    /// Set the file type.
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expiry.
    pub fn with_expiry(mut self, expires_at: Expiry) -> Self {
        self.expires_at = expires_at;
        self
    }
}

/// Optional search filters, AND-combined. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring of the file name.
    pub name: Option<String>,
    /// Exact calendar date (UTC) of the upload time.
    pub upload_date: Option<chrono::NaiveDate>,
    /// Case-insensitive extension suffix, with or without the leading dot.
    pub file_type: Option<String>,
}

impl SearchFilter {
    /// Build a filter from raw query values.
    ///
    /// Empty strings are treated as absent; an unparsable date is ignored.
    pub fn from_query(
        name: Option<&str>,
        upload_date: Option<&str>,
        file_type: Option<&str>,
    ) -> Self {
        let non_empty = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        Self {
            name: non_empty(name),
            upload_date: upload_date.and_then(datetime::parse_date),
            file_type: non_empty(file_type)
                .map(|t| t.trim_start_matches('.').to_string())
                .filter(|t| !t.is_empty()),
        }
    }
}

const FILE_COLUMNS: &str = "id, owner_id, file_name, upload_time, size_bytes, storage_path, \
                            file_type, external_url, description, is_shared, expires_at";

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new file entry. New entries are never shared.
    ///
    /// Fails with `OwnerNotFound` if the owner row does not exist.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (owner_id, file_name, upload_time, size_bytes, storage_path,
                                file_type, description, is_shared, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(file.owner_id)
        .bind(&file.file_name)
        .bind(datetime::now_db())
        .bind(file.size_bytes)
        .bind(&file.storage_path)
        .bind(&file.file_type)
        .bind(&file.description)
        .bind(false)
        .bind(file.expires_at.to_db())
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                VaultError::OwnerNotFound(file.owner_id)
            }
            other => VaultError::PersistenceFailure(other.to_string()),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::PersistenceFailure(format!("file {id} vanished after insert")))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let row: Option<FileRow> =
            sqlx::query_as(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(row.map(FileRow::into_record))
    }

    /// List all files owned by a user, oldest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(rows.into_iter().map(FileRow::into_record).collect())
    }

    /// Search a user's files.
    pub async fn search(&self, owner_id: i64, filter: &SearchFilter) -> Result<Vec<FileRecord>> {
        let mut query: QueryBuilder<DbBackend> =
            QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE owner_id = "));
        query.push_bind(owner_id);

        if let Some(ref name) = filter.name {
            query.push(" AND LOWER(file_name) LIKE ");
            query.push_bind(format!("%{}%", escape_like(&name.to_lowercase())));
            query.push(" ESCAPE '\\'");
        }
        if let Some(date) = filter.upload_date {
            query.push(" AND SUBSTR(upload_time, 1, 10) = ");
            query.push_bind(date.format("%Y-%m-%d").to_string());
        }
        if let Some(ref file_type) = filter.file_type {
            query.push(" AND LOWER(file_name) LIKE ");
            query.push_bind(format!("%.{}", escape_like(&file_type.to_lowercase())));
            query.push(" ESCAPE '\\'");
        }
        query.push(" ORDER BY id");

        let rows: Vec<FileRow> = query
            .build_query_as()
            .fetch_all(self.pool)
            .await
            .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(rows.into_iter().map(FileRow::into_record).collect())
    }

    /// Mark a file as shared.
    ///
    /// Returns true if the flag changed (it was not already set).
    pub async fn mark_shared(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET is_shared = $1 WHERE id = $2 AND is_shared = $3")
            .bind(true)
            .bind(id)
            .bind(false)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// List files whose expiry is strictly before `now`.
    ///
    /// Files that never expire are never returned.
    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE expires_at IS NOT NULL AND expires_at < $1 ORDER BY id"
        ))
        .bind(datetime::to_db(&now))
        .fetch_all(self.pool)
        .await
        .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(rows.into_iter().map(FileRow::into_record).collect())
    }

    /// Delete a file by ID.
    ///
    /// Returns true if a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count files owned by a user.
    pub async fn count_by_owner(&self, owner_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(count)
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Intermediate struct for database row mapping
#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    owner_id: i64,
    file_name: String,
    upload_time: String,
    size_bytes: i64,
    storage_path: String,
    file_type: String,
    external_url: String,
    description: String,
    is_shared: bool,
    expires_at: Option<String>,
}

impl FileRow {
    fn into_record(self) -> FileRecord {
        FileRecord {
            id: self.id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            upload_time: datetime::from_db(&self.upload_time).unwrap_or_default(),
            size_bytes: self.size_bytes,
            storage_path: self.storage_path,
            file_type: self.file_type,
            external_url: self.external_url,
            description: self.description,
            is_shared: self.is_shared,
            expires_at: Expiry::from_db(self.expires_at.as_deref()),
        }
    }
}
