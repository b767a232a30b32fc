//! Per-user profile details (`user_profiles` table).

use anyhow::Result;
use sqlx::SqlitePool;

use crate::data::models::Profile;

/// Insert or fully replace the profile row for `profile.username`.
pub async fn upsert_profile(pool: &SqlitePool, profile: &Profile) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO user_profiles \
         (username, full_name, age, gender, email, phone, address, city, state, country, photo) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&profile.username)
    .bind(&profile.full_name)
    .bind(profile.age)
    .bind(&profile.gender)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.address)
    .bind(&profile.city)
    .bind(&profile.state)
    .bind(&profile.country)
    .bind(&profile.photo)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_profile(pool: &SqlitePool, username: &str) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT username, full_name, age, gender, email, phone, address, city, state, country, photo \
         FROM user_profiles WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}
