//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use filevault::cache::{FileCache, MemoryCache};
use filevault::file::{FileService, FileStorage, PublicUrls, Sweeper};
use filevault::web::{create_router, AppState};
use filevault::{Database, TokenIssuer, User};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const BASE_URL: &str = "http://localhost:8080";
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A running router with its collaborators exposed for assertions.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage: FileStorage,
    pub cache: FileCache,
    pub backend: Arc<MemoryCache>,
    pub tokens: TokenIssuer,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_max_file_size(10 * 1024 * 1024).await
    }

    pub async fn with_max_file_size(max_file_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let storage =
            FileStorage::new(temp_dir.path().join("uploads")).expect("Failed to create storage");
        let backend = Arc::new(MemoryCache::new());
        let cache = FileCache::new(Some(backend.clone()), Duration::from_secs(3600));
        let urls = PublicUrls::new(BASE_URL, PUBLIC_PREFIX).expect("Invalid public URL");
        let tokens = TokenIssuer::new(JWT_SECRET, 3600);

        let files = FileService::new(db.pool().clone(), storage.clone(), cache.clone(), urls)
            .with_max_file_size(max_file_size);
        let state = Arc::new(AppState::new(db.clone(), files, tokens.clone()));
        let router = create_router(state, PUBLIC_PREFIX, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage,
            cache,
            backend,
            tokens,
            _temp_dir: temp_dir,
        }
    }

    /// A sweeper over the same store, blobs and cache as the server.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            self.db.pool().clone(),
            self.storage.clone(),
            self.cache.clone(),
        )
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/register")
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/login")
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    /// Register and log in, returning a bearer token.
    pub async fn signup(&self, email: &str) -> String {
        self.register(email, "password123").await;
        let body: Value = self.login(email, "password123").await.json();
        body["token"].as_str().expect("token in login response").to_string()
    }

    /// Token for an account that does not exist in the database.
    pub fn token_for_missing_user(&self, id: i64) -> String {
        let ghost = User {
            id,
            email: "ghost@example.com".to_string(),
            password_hash: String::new(),
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        self.tokens.issue(&ghost).expect("token")
    }

    pub async fn upload(&self, token: &str, filename: &str, content: &[u8]) -> TestResponse {
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(content.to_vec()).file_name(filename.to_string()),
        );
        self.upload_form(token, form).await
    }

    pub async fn upload_form(&self, token: &str, form: MultipartForm) -> TestResponse {
        self.server
            .post("/upload")
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(form)
            .await
    }

    pub async fn get(&self, token: &str, path: &str) -> TestResponse {
        self.server
            .get(path)
            .add_header(AUTHORIZATION, bearer(token))
            .await
    }

    pub async fn list(&self, token: &str) -> Vec<Value> {
        let response = self.get(token, "/files").await;
        response.assert_status_ok();
        response.json::<Vec<Value>>()
    }

    pub fn upload_dir_entries(&self) -> usize {
        std::fs::read_dir(self.storage.base_path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Path part of a public file URL, e.g. `/uploads/<name>`.
pub fn public_path(file_url: &str) -> String {
    file_url
        .strip_prefix(BASE_URL)
        .expect("URL under the public base")
        .to_string()
}
