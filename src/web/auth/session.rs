//! Cookie sessions backed by the `user_sessions` table.
//!
//! Lookups hit an in-memory [`DashMap`] first and fall back to the database,
//! so sessions survive restarts while hot requests skip the query.

use anyhow::Result;
use cookie::{Cookie, SameSite};
use dashmap::DashMap;
use http::HeaderMap;
use http::header::COOKIE;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::data::models::SessionRow;
use crate::data::sessions;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
struct CachedSession {
    username: String,
    expires_at: i64,
}

#[derive(Clone)]
pub struct SessionCache {
    cache: Arc<DashMap<String, CachedSession>>,
    db_pool: SqlitePool,
}

impl SessionCache {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            db_pool,
        }
    }

    pub async fn create(&self, username: &str, ttl: Duration) -> Result<SessionRow> {
        let row = sessions::create(&self.db_pool, username, ttl).await?;
        self.cache.insert(
            row.id.clone(),
            CachedSession {
                username: row.username.clone(),
                expires_at: row.expires_at,
            },
        );
        Ok(row)
    }

    /// Username for a live session id.
    pub async fn resolve(&self, id: &str) -> Result<Option<String>> {
        let now = chrono::Utc::now().timestamp();

        if let Some(entry) = self.cache.get(id) {
            if entry.expires_at > now {
                return Ok(Some(entry.username.clone()));
            }
            drop(entry);
            self.cache.remove(id);
            return Ok(None);
        }

        let Some(row) = sessions::find_valid(&self.db_pool, id).await? else {
            return Ok(None);
        };
        debug!(username = %row.username, "session loaded from database");
        self.cache.insert(
            row.id,
            CachedSession {
                username: row.username.clone(),
                expires_at: row.expires_at,
            },
        );
        Ok(Some(row.username))
    }

    pub async fn revoke(&self, id: &str) -> Result<()> {
        self.cache.remove(id);
        sessions::delete(&self.db_pool, id).await
    }

    /// Drop expired sessions from both the cache and the database.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        self.cache.retain(|_, s| s.expires_at > now);
        sessions::purge_expired(&self.db_pool).await
    }
}

/// The session id from the request's `Cookie` headers, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(id: &str, ttl: Duration, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, id.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(ttl.as_secs() as i64))
        .build()
        .to_string()
}

pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie.to_string()
}
