//! Registered user accounts.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::data::models::User;

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("username already exists")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Insert a user with an already-hashed password. Returns the new row id.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<i64, CreateUserError> {
    let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CreateUserError::Duplicate),
        Err(e) => Err(e.into()),
    }
}

/// The stored password hash for `username`, if the user exists.
pub async fn get_password_hash(pool: &SqlitePool, username: &str) -> Result<Option<String>> {
    let hash = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(hash)
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT id, username FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
