//! User repository for filevault.
//!
//! This module provides CRUD operations for users in the database.

use super::user::{NewUser, User};
use super::DbPool;
use crate::{Result, VaultError};

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID, or `Conflict` if the
    /// email is already registered.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, created_at)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(crate::datetime::now_db())
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                VaultError::Conflict("email already registered".to_string())
            }
            other => VaultError::PersistenceFailure(other.to_string()),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at
             FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(result)
    }

    /// Check whether a user with the given ID exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(count > 0)
    }

    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_one(self.pool)
                .await
                .map_err(|e| VaultError::PersistenceFailure(e.to_string()))?;

        Ok(count > 0)
    }
}
