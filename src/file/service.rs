//! File service for filevault.
//!
//! This module provides the file lifecycle operations:
//! - Upload with owner and size checks, compensating blob cleanup
//! - Cache-first listing and uncached search
//! - Share link minting with a cached TTL

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::FileCache;
use crate::db::{DbPool, UserRepository};
use crate::{Result, VaultError};

use super::metadata::{Expiry, FileRecord, FileRepository, NewFileRecord, SearchFilter};
use super::path::PublicUrls;
use super::storage::FileStorage;
use super::{DEFAULT_MAX_FILE_SIZE, MAX_DESCRIPTION_LENGTH};

/// Request data for file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original filename (only its extension is kept).
    pub filename: String,
    /// File description (optional).
    pub description: Option<String>,
    /// Lifetime after which the sweeper may reclaim the file.
    pub expires_in: Option<Duration>,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            description: None,
            expires_in: None,
            content,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the lifetime.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// The persisted record.
    pub record: FileRecord,
    /// Public URL of the stored blob.
    pub file_url: String,
}

/// An owner's file listing.
#[derive(Debug, Clone)]
pub enum Listing {
    /// Served from cache; the JSON is returned verbatim.
    Cached(String),
    /// Loaded from the database (and written back to the cache).
    Loaded(Vec<FileRecord>),
}

impl Listing {
    /// JSON body for the listing.
    pub fn into_json(self) -> Result<String> {
        match self {
            Listing::Cached(json) => Ok(json),
            Listing::Loaded(files) => Ok(serde_json::to_string(&files)?),
        }
    }
}

/// File lifecycle manager.
///
/// Holds its collaborators by value; all of them are cheap to clone.
#[derive(Debug, Clone)]
pub struct FileService {
    pool: DbPool,
    storage: FileStorage,
    cache: FileCache,
    urls: PublicUrls,
    max_file_size: usize,
    share_requires_owner: bool,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(pool: DbPool, storage: FileStorage, cache: FileCache, urls: PublicUrls) -> Self {
        Self {
            pool,
            storage,
            cache,
            urls,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            share_requires_owner: false,
        }
    }

    /// Set the maximum accepted upload size in bytes.
    pub fn with_max_file_size(mut self, max_size: usize) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Only let owners mint share links for their files.
    pub fn with_share_requires_owner(mut self, required: bool) -> Self {
        self.share_requires_owner = required;
        self
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Error returned for uploads over the configured size limit.
    pub fn size_limit_error(&self) -> VaultError {
        const MIB: usize = 1024 * 1024;
        let limit = if self.max_file_size >= MIB && self.max_file_size % MIB == 0 {
            format!("{}MB", self.max_file_size / MIB)
        } else {
            format!("{} bytes", self.max_file_size)
        };
        VaultError::InvalidRequest(format!("file exceeds the maximum upload size of {limit}"))
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Upload a file for `owner_id`.
    ///
    /// The owner is checked before any bytes are written. If the metadata
    /// insert fails, the freshly written blob is removed again.
    pub async fn upload(&self, owner_id: i64, request: &UploadRequest) -> Result<UploadResult> {
        if request.content.len() > self.max_file_size {
            return Err(self.size_limit_error());
        }

        if let Some(ref desc) = request.description {
            if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(VaultError::InvalidRequest(format!(
                    "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
                )));
            }
        }

        let expires_at = match request.expires_in {
            None => Expiry::Never,
            Some(d) if d.is_zero() => {
                return Err(VaultError::InvalidRequest(
                    "expires_in must be a positive number of seconds".to_string(),
                ));
            }
            Some(d) => {
                let d = chrono::Duration::from_std(d).map_err(|_| {
                    VaultError::InvalidRequest("expires_in is out of range".to_string())
                })?;
                let at = Utc::now().checked_add_signed(d).ok_or_else(|| {
                    VaultError::InvalidRequest("expires_in is out of range".to_string())
                })?;
                Expiry::At(at)
            }
        };

        if !UserRepository::new(&self.pool).exists(owner_id).await? {
            return Err(VaultError::OwnerNotFound(owner_id));
        }

        let location = self.storage.save(&request.content, &request.filename).await?;

        let new_file = NewFileRecord::new(owner_id, &location, request.content.len() as i64)
            .with_file_type(FileStorage::file_type(&request.filename))
            .with_description(request.description.clone().unwrap_or_default())
            .with_expiry(expires_at);

        let record = match FileRepository::new(&self.pool).create(&new_file).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&location).await {
                    warn!(path = %location, error = %cleanup, "Failed to remove blob after insert failure");
                }
                return Err(e);
            }
        };

        self.cache.store_metadata(&record).await;
        self.cache.invalidate_listing(owner_id).await;

        let file_url = self.urls.url_for(&location);
        info!(
            file_id = record.id,
            owner_id,
            size = record.size_bytes,
            "File uploaded"
        );

        Ok(UploadResult { record, file_url })
    }

    /// All files owned by `owner_id`, served from cache when possible.
    pub async fn list(&self, owner_id: i64) -> Result<Listing> {
        if let Some(json) = self.cache.listing(owner_id).await {
            return Ok(Listing::Cached(json));
        }

        let files = FileRepository::new(&self.pool).list_by_owner(owner_id).await?;
        self.cache.store_listing(owner_id, &files).await;
        debug!(owner_id, count = files.len(), "Loaded file listing");

        Ok(Listing::Loaded(files))
    }

    /// Search the owner's files. Results are never cached.
    pub async fn search(&self, owner_id: i64, filter: &SearchFilter) -> Result<Vec<FileRecord>> {
        FileRepository::new(&self.pool).search(owner_id, filter).await
    }

    /// Get a file's metadata, consulting the metadata cache first.
    pub async fn get(&self, file_id: i64) -> Result<FileRecord> {
        if let Some(record) = self.cache.metadata(file_id).await {
            return Ok(record);
        }
        FileRepository::new(&self.pool)
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    /// Public URL for `file_id`.
    ///
    /// A cached URL is returned unchanged. Otherwise the URL is built from
    /// the stored path, the record is flagged as shared, and the URL is
    /// cached for the share TTL. Expiry is not checked: a file the sweeper
    /// has not reached yet still gets a link.
    pub async fn share(&self, requester_id: i64, file_id: i64) -> Result<String> {
        let preloaded = if self.share_requires_owner {
            let record = self.get(file_id).await?;
            if record.owner_id != requester_id {
                return Err(VaultError::NotFound("file".to_string()));
            }
            Some(record)
        } else {
            None
        };

        if let Some(url) = self.cache.share_url(file_id).await {
            debug!(file_id, "Share link served from cache");
            return Ok(url);
        }

        let mut record = match preloaded {
            Some(record) => record,
            None => self.get(file_id).await?,
        };

        let url = self.urls.url_for(&record.location());

        if FileRepository::new(&self.pool).mark_shared(file_id).await? {
            record.is_shared = true;
            self.cache.invalidate_listing(record.owner_id).await;
            self.cache.store_metadata(&record).await;
        }
        self.cache.store_share_url(file_id, &url).await;

        info!(file_id, requester_id, "Share link minted");
        Ok(url)
    }
}

#[cfg(all(test, not(feature = "postgres")))]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCache};
    use crate::db::{Database, NewUser};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        backend: Arc<MemoryCache>,
        service: FileService,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp_dir.path().join("uploads")).unwrap();
        let backend = Arc::new(MemoryCache::new());
        let cache = FileCache::new(Some(backend.clone()), Duration::from_secs(3600));
        let urls = PublicUrls::new("http://localhost:8080", "/uploads").unwrap();
        let service = FileService::new(db.pool().clone(), storage, cache, urls);

        Fixture {
            _temp_dir: temp_dir,
            db,
            backend,
            service,
        }
    }

    async fn create_user(db: &Database, email: &str) -> i64 {
        UserRepository::new(db.pool())
            .create(&NewUser::new(email, "hash"))
            .await
            .unwrap()
            .id
    }

    fn count_blobs(storage: &FileStorage) -> usize {
        std::fs::read_dir(storage.base_path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let content = vec![b'x'; 40];
        let result = fx
            .service
            .upload(owner, &UploadRequest::new("report.txt", content))
            .await
            .unwrap();

        assert!(result.file_url.starts_with("http://localhost:8080/uploads/"));
        assert!(result.file_url.ends_with(".txt"));
        assert_eq!(result.record.size_bytes, 40);
        assert_eq!(result.record.file_type, ".txt");
        assert!(!result.record.is_shared);
        assert_eq!(result.record.expires_at, Expiry::Never);

        let blob = fx.service.storage().load(&result.record.location()).await.unwrap();
        assert_eq!(blob.len(), 40);

        match fx.service.list(owner).await.unwrap() {
            Listing::Loaded(files) => {
                assert_eq!(files.len(), 1);
                assert!(files[0].file_name.ends_with(".txt"));
                assert_eq!(files[0].size_bytes, 40);
            }
            Listing::Cached(_) => panic!("expected cold listing"),
        }

        // Second read is served from cache
        match fx.service.list(owner).await.unwrap() {
            Listing::Cached(json) => {
                let files: Vec<FileRecord> = serde_json::from_str(&json).unwrap();
                assert_eq!(files.len(), 1);
            }
            Listing::Loaded(_) => panic!("expected cached listing"),
        }
    }

    #[tokio::test]
    async fn test_upload_invalidates_listing() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        fx.service
            .upload(owner, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();
        fx.service.list(owner).await.unwrap();

        fx.service
            .upload(owner, &UploadRequest::new("b.txt", b"b".to_vec()))
            .await
            .unwrap();

        let json = fx.service.list(owner).await.unwrap().into_json().unwrap();
        let files: Vec<FileRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_seeds_metadata_cache() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let result = fx
            .service
            .upload(owner, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();

        let key = crate::cache::file_metadata_key(result.record.id);
        assert!(fx.backend.get(&key).await.unwrap().is_some());
        assert_eq!(fx.service.get(result.record.id).await.unwrap(), result.record);
    }

    #[tokio::test]
    async fn test_upload_unknown_owner_writes_nothing() {
        let fx = setup().await;

        let result = fx
            .service
            .upload(999, &UploadRequest::new("a.txt", b"data".to_vec()))
            .await;

        assert!(matches!(result, Err(VaultError::OwnerNotFound(999))));
        assert_eq!(
            FileRepository::new(fx.db.pool()).count_by_owner(999).await.unwrap(),
            0
        );
        assert_eq!(count_blobs(fx.service.storage()), 0);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;
        let service = fx.service.clone().with_max_file_size(8);

        let result = service
            .upload(owner, &UploadRequest::new("a.txt", vec![0; 9]))
            .await;

        assert!(matches!(result, Err(VaultError::InvalidRequest(_))));
        assert_eq!(count_blobs(service.storage()), 0);
    }

    #[tokio::test]
    async fn test_size_limit_message() {
        let fx = setup().await;

        let small = fx.service.clone().with_max_file_size(1024);
        assert_eq!(
            small.size_limit_error().to_string(),
            "invalid request: file exceeds the maximum upload size of 1024 bytes"
        );

        let large = fx.service.clone().with_max_file_size(10 * 1024 * 1024);
        assert!(large.size_limit_error().to_string().ends_with("of 10MB"));
    }

    #[tokio::test]
    async fn test_upload_zero_expiry_rejected() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let request = UploadRequest::new("a.txt", b"data".to_vec()).with_expires_in(Duration::ZERO);
        let result = fx.service.upload(owner, &request).await;

        assert!(matches!(result, Err(VaultError::InvalidRequest(_))));
        assert_eq!(count_blobs(fx.service.storage()), 0);
    }

    #[tokio::test]
    async fn test_upload_with_expiry_and_description() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let request = UploadRequest::new("a.pdf", b"pdf".to_vec())
            .with_description("quarterly numbers")
            .with_expires_in(Duration::from_secs(3600));
        let result = fx.service.upload(owner, &request).await.unwrap();

        assert_eq!(result.record.description, "quarterly numbers");
        match result.record.expires_at {
            Expiry::At(at) => assert!(at > Utc::now()),
            Expiry::Never => panic!("expected an expiry"),
        }
    }

    #[tokio::test]
    async fn test_upload_insert_failure_removes_blob() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        sqlx::query("DROP TABLE files")
            .execute(fx.db.pool())
            .await
            .unwrap();

        let result = fx
            .service
            .upload(owner, &UploadRequest::new("a.txt", b"data".to_vec()))
            .await;

        assert!(matches!(result, Err(VaultError::PersistenceFailure(_))));
        assert_eq!(count_blobs(fx.service.storage()), 0);
    }

    #[tokio::test]
    async fn test_search_by_type() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        fx.service
            .upload(owner, &UploadRequest::new("a.pdf", b"1".to_vec()))
            .await
            .unwrap();
        fx.service
            .upload(owner, &UploadRequest::new("b.txt", b"2".to_vec()))
            .await
            .unwrap();

        let pdfs = fx
            .service
            .search(owner, &SearchFilter::from_query(None, None, Some("pdf")))
            .await
            .unwrap();
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].file_type, ".pdf");

        let all = fx
            .service
            .search(owner, &SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_share_mints_and_caches() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let uploaded = fx
            .service
            .upload(owner, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();
        fx.service.list(owner).await.unwrap();

        let url = fx.service.share(owner, uploaded.record.id).await.unwrap();
        assert_eq!(url, uploaded.file_url);

        let record = FileRepository::new(fx.db.pool())
            .get_by_id(uploaded.record.id)
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_shared);

        // Listing was invalidated and reflects the flag
        match fx.service.list(owner).await.unwrap() {
            Listing::Loaded(files) => assert!(files[0].is_shared),
            Listing::Cached(_) => panic!("listing should have been invalidated"),
        }

        let key = crate::cache::shared_file_key(uploaded.record.id);
        assert_eq!(fx.backend.get(&key).await.unwrap(), Some(url));
    }

    #[tokio::test]
    async fn test_share_cache_hit_is_returned_unchanged() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let uploaded = fx
            .service
            .upload(owner, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();

        let key = crate::cache::shared_file_key(uploaded.record.id);
        fx.backend
            .set(&key, "http://cdn.example.com/a.txt", None)
            .await
            .unwrap();

        let url = fx.service.share(owner, uploaded.record.id).await.unwrap();
        assert_eq!(url, "http://cdn.example.com/a.txt");
    }

    #[tokio::test]
    async fn test_share_missing_file() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let result = fx.service.share(owner, 12345).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_share_expired_but_unswept_file() {
        let fx = setup().await;
        let owner = create_user(&fx.db, "a@example.com").await;

        let uploaded = fx
            .service
            .upload(owner, &UploadRequest::new("old.txt", b"a".to_vec()))
            .await
            .unwrap();
        sqlx::query("UPDATE files SET expires_at = $1 WHERE id = $2")
            .bind("2000-01-01 00:00:00")
            .bind(uploaded.record.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        let url = fx.service.share(owner, uploaded.record.id).await.unwrap();
        assert_eq!(url, uploaded.file_url);
    }

    #[tokio::test]
    async fn test_share_requires_owner() {
        let fx = setup().await;
        let alice = create_user(&fx.db, "alice@example.com").await;
        let bob = create_user(&fx.db, "bob@example.com").await;
        let service = fx.service.clone().with_share_requires_owner(true);

        let uploaded = service
            .upload(alice, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();

        // Even a cached link is not handed to another user
        service.share(alice, uploaded.record.id).await.unwrap();
        let result = service.share(bob, uploaded.record.id).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_share_without_owner_check_allows_others() {
        let fx = setup().await;
        let alice = create_user(&fx.db, "alice@example.com").await;
        let bob = create_user(&fx.db, "bob@example.com").await;

        let uploaded = fx
            .service
            .upload(alice, &UploadRequest::new("a.txt", b"a".to_vec()))
            .await
            .unwrap();

        assert!(fx.service.share(bob, uploaded.record.id).await.is_ok());
    }
}
