//! HTTP interface for filevault.
//!
//! JSON account endpoints, multipart upload, listing, search and share
//! endpoints behind bearer tokens, and static serving of stored files.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
