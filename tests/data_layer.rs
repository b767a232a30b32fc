//! Query-level tests against a migrated SQLite database from `#[sqlx::test]`.

mod helpers;

use healthrisk::data::predictions::{self, NewPrediction};
use healthrisk::data::{sessions, users};
use healthrisk::model::features::FEATURE_NAMES;
use healthrisk::web::auth::session::SessionCache;
use helpers::sample_metrics;
use indexmap::IndexMap;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;

async fn add_user(pool: &SqlitePool, username: &str) {
    users::create_user(pool, username, "not-a-real-hash")
        .await
        .expect("failed to insert user");
}

/// Insert a session row directly, bypassing any cache.
async fn insert_session(pool: &SqlitePool, id: &str, username: &str, expires_at: i64) {
    sqlx::query(
        "INSERT INTO user_sessions (id, username, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(username)
    .bind(expires_at - 3600)
    .bind(expires_at)
    .execute(pool)
    .await
    .expect("failed to insert session");
}

async fn session_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions")
        .fetch_one(pool)
        .await
        .expect("count sessions")
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_find_valid_skips_expired_rows(pool: SqlitePool) {
    add_user(&pool, "ann").await;
    let now = chrono::Utc::now().timestamp();
    insert_session(&pool, "live", "ann", now + 600).await;
    insert_session(&pool, "stale", "ann", now - 1).await;

    let live = sessions::find_valid(&pool, "live").await.expect("query");
    assert_eq!(live.map(|s| s.username).as_deref(), Some("ann"));
    assert!(sessions::find_valid(&pool, "stale").await.expect("query").is_none());
    assert!(sessions::find_valid(&pool, "missing").await.expect("query").is_none());
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_expired_session_is_rejected_from_cache(pool: SqlitePool) {
    add_user(&pool, "ann").await;
    let cache = SessionCache::new(pool.clone());

    let live = cache
        .create("ann", Duration::from_secs(600))
        .await
        .expect("create session");
    assert_eq!(cache.resolve(&live.id).await.expect("resolve").as_deref(), Some("ann"));

    // A zero TTL expires immediately, so the cached entry is already stale.
    let expired = cache
        .create("ann", Duration::ZERO)
        .await
        .expect("create session");
    assert_eq!(cache.resolve(&expired.id).await.expect("resolve"), None);
    // The stale entry was evicted; the second lookup goes to the database.
    assert_eq!(cache.resolve(&expired.id).await.expect("resolve"), None);
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_expired_session_is_rejected_from_database(pool: SqlitePool) {
    add_user(&pool, "ann").await;
    let now = chrono::Utc::now().timestamp();
    insert_session(&pool, "stale", "ann", now - 60).await;
    insert_session(&pool, "live", "ann", now + 600).await;

    let cache = SessionCache::new(pool.clone());
    assert_eq!(cache.resolve("stale").await.expect("resolve"), None);
    assert_eq!(cache.resolve("live").await.expect("resolve").as_deref(), Some("ann"));
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_purge_expired_deletes_only_stale_rows(pool: SqlitePool) {
    add_user(&pool, "ann").await;
    let now = chrono::Utc::now().timestamp();
    insert_session(&pool, "stale-1", "ann", now - 60).await;
    insert_session(&pool, "stale-2", "ann", now).await;
    insert_session(&pool, "live", "ann", now + 600).await;

    let cache = SessionCache::new(pool.clone());
    let cached_stale = cache
        .create("ann", Duration::ZERO)
        .await
        .expect("create session");
    assert_eq!(session_count(&pool).await, 4);

    let purged = cache.purge_expired().await.expect("purge");
    assert_eq!(purged, 3);
    assert_eq!(session_count(&pool).await, 1);
    assert_eq!(cache.resolve(&cached_stale.id).await.expect("resolve"), None);
    assert_eq!(cache.resolve("live").await.expect("resolve").as_deref(), Some("ann"));

    assert_eq!(sessions::purge_expired(&pool).await.expect("purge"), 0);
}

#[sqlx::test(migrator = "healthrisk::data::MIGRATOR")]
async fn test_prediction_input_is_stored_typed(pool: SqlitePool) {
    add_user(&pool, "ann").await;
    let metrics = sample_metrics();
    let risks: IndexMap<String, f64> = [("CVD Risk".to_string(), 12.5)].into_iter().collect();

    let id = predictions::insert_prediction(
        &pool,
        &NewPrediction {
            username: "ann",
            date: "2025-03-01 09:30:00",
            input_data: &metrics,
            risks: &risks,
            highest_risk: "CVD Risk",
        },
    )
    .await
    .expect("insert prediction");

    let rows = predictions::list_for_user(&pool, "ann").await.expect("list");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, id);
    assert!(row.input_data.keys().map(String::as_str).eq(FEATURE_NAMES));
    assert_eq!(row.input_data["Age"], json!(3));
    assert_eq!(row.input_data["BMI"], json!(22.5));
    assert_eq!(row.input_data["Diet_Type"], json!("High-Sugar"));
    assert_eq!(row.risks.get("CVD Risk"), Some(&12.5));

    assert!(!predictions::delete_for_user(&pool, id, "bob").await.expect("delete"));
    assert!(predictions::delete_for_user(&pool, id, "ann").await.expect("delete"));
    assert_eq!(predictions::count(&pool).await.expect("count"), 0);
}
