//! User accounts and API token management
//!
//! Tokens are random strings handed to the client exactly once. Only the
//! blake3 digest is persisted, so a database leak does not leak credentials.

use crate::db::get_db_pool;
use crate::orm::users;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{entity::*, query::*, DbErr};

pub const API_TOKEN_LENGTH: usize = 40;

/// Generate a new random API token.
pub fn generate_api_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash an API token for storage or lookup.
pub fn hash_api_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_string()
}

/// Insert a new user account.
pub async fn create_user(username: &str, email: Option<&str>) -> Result<users::Model, DbErr> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let user = users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(email.map(|e| e.trim().to_lowercase())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    user.insert(db).await
}

/// Mint a fresh API token for a user, replacing any existing one.
///
/// Returns the plaintext token. It cannot be recovered afterwards.
pub async fn issue_api_token(user_id: i32) -> Result<String, DbErr> {
    let db = get_db_pool();

    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("User {} not found", user_id)))?;

    let token = generate_api_token();

    let mut active: users::ActiveModel = user.into();
    active.api_token_hash = Set(Some(hash_api_token(&token)));
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(db).await?;

    Ok(token)
}

/// Look up the user owning a plaintext API token, if any.
pub async fn authenticate_by_token(token: &str) -> Result<Option<users::Model>, DbErr> {
    if token.is_empty() {
        return Ok(None);
    }

    let db = get_db_pool();
    users::Entity::find()
        .filter(users::Column::ApiTokenHash.eq(hash_api_token(token)))
        .one(db)
        .await
}

/// Fetch a user by id.
pub async fn get_user(user_id: i32) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(user_id).one(get_db_pool()).await
}

/// Delete a user account.
///
/// Their anonymous survey participation records go with them. Responses and
/// audit rows survive with the user reference cleared.
pub async fn delete_user(user_id: i32) -> Result<(), DbErr> {
    let db = get_db_pool();
    users::Entity::delete_by_id(user_id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length() {
        let token = generate_api_token();
        assert_eq!(token.len(), API_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_api_token(), generate_api_token());
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let digest = hash_api_token("abc123");
        assert_eq!(digest, hash_api_token("abc123"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
