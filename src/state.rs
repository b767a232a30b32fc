//! Application state shared across request handlers.

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::model::RiskPredictor;
use crate::web::auth::session::SessionCache;

/// Request-path settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub upload_dir: PathBuf,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl From<&Config> for WebSettings {
    fn from(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            session_ttl: config.session_ttl,
            secure_cookies: config.secure_cookies,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub model: Arc<dyn RiskPredictor>,
    pub sessions: SessionCache,
    pub settings: Arc<WebSettings>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, model: Arc<dyn RiskPredictor>, settings: WebSettings) -> Self {
        Self {
            sessions: SessionCache::new(db_pool.clone()),
            db_pool,
            model,
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }
}
