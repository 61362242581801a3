//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;
use url::Url;

use super::Cache;
use crate::{Result, VaultError};

/// Cache backed by a Redis server over a multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connect to Redis. A separately configured password is merged into the URL.
    pub async fn connect(redis_url: &str, password: Option<&str>) -> Result<Self> {
        let url = connection_url(redis_url, password)?;
        let client = redis::Client::open(url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;

        info!(host = url.host_str().unwrap_or_default(), "Connected to Redis");
        Ok(Self { conn })
    }
}

fn connection_url(redis_url: &str, password: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(redis_url)
        .map_err(|e| VaultError::Config(format!("invalid redis_url: {e}")))?;

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        url.set_password(Some(password))
            .map_err(|_| VaultError::Config("redis_url cannot carry a password".to_string()))?;
    }
    Ok(url)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            // SETEX rejects 0, round sub-second TTLs up
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                let _: () = conn.set_ex(key, value, secs).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url_without_password() {
        let url = connection_url("redis://localhost:6379", None).unwrap();
        assert_eq!(url.as_str(), "redis://localhost:6379");
    }

    #[test]
    fn test_connection_url_merges_password() {
        let url = connection_url("redis://localhost:6379/0", Some("s3cret")).unwrap();
        assert_eq!(url.password(), Some("s3cret"));
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_connection_url_ignores_empty_password() {
        let url = connection_url("redis://localhost:6379", Some("")).unwrap();
        assert!(url.password().is_none());
    }

    #[test]
    fn test_connection_url_invalid() {
        assert!(matches!(
            connection_url("not a url", None),
            Err(VaultError::Config(_))
        ));
    }
}
