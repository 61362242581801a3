//! filevault - multi-tenant file hosting backend.
//!
//! Users register and log in, upload files to local disk with metadata in a
//! relational store, and list, search and share them through public URLs.
//! A background sweeper reclaims files whose expiry has passed.

pub mod auth;
pub mod cache;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, validate_password, verify_password, Claims,
    PasswordError, RegistrationError, RegistrationRequest, TokenIssuer,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{Result, VaultError};
pub use file::{FileRecord, FileService, FileStorage, PublicUrls, Sweeper};
