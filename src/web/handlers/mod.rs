//! HTTP handlers.

pub mod auth;
pub mod file;
pub mod health;

pub use auth::*;
pub use file::*;
pub use health::*;

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::db::DbPool;
use crate::file::FileService;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub files: FileService,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(db: Database, files: FileService, tokens: TokenIssuer) -> Self {
        Self {
            db,
            files,
            tokens: Arc::new(tokens),
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.db.pool()
    }
}
