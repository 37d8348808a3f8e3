//! Opaque bearer tokens: one per user, reused across logins until revoked.

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::info;

use crate::error::AppError;
use crate::models::auth_token::{self, Column as TokenCol, Entity as AuthToken};
use crate::models::user::{self, Entity as User};

const KEY_BYTES: usize = 20;

/// 20 random bytes, hex encoded (40 chars).
fn generate_key() -> String {
    let mut raw = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Returns the user's existing key, issuing one on first login.
pub async fn get_or_create_token<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<String, AppError> {
    if let Some(existing) = AuthToken::find()
        .filter(TokenCol::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(existing.key);
    }

    let created = auth_token::ActiveModel {
        key: Set(generate_key()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await;

    match created {
        Ok(row) => {
            info!(user_id, "auth token issued");
            Ok(row.key)
        }
        // a concurrent login for the same user won the insert; use its key
        Err(e) if AppError::is_unique_violation(&e) => AuthToken::find()
            .filter(TokenCol::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|row| row.key)
            .ok_or(AppError::Db(e)),
        Err(e) => Err(e.into()),
    }
}

/// Deletes the user's key. Returns whether one existed.
pub async fn revoke_token<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<bool, AppError> {
    let res = AuthToken::delete_many()
        .filter(TokenCol::UserId.eq(user_id))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        info!(user_id, "auth token revoked");
    }
    Ok(res.rows_affected > 0)
}

/// Resolves a presented key to its active owner.
pub async fn resolve_token<C: ConnectionTrait>(db: &C, key: &str) -> Result<user::Model, AppError> {
    let Some((_, owner)) = AuthToken::find_by_id(key.to_owned())
        .find_also_related(User)
        .one(db)
        .await?
    else {
        return Err(AppError::InvalidToken);
    };

    match owner {
        Some(u) if u.is_active => Ok(u),
        Some(_) => Err(AppError::InactiveUser),
        None => Err(AppError::InvalidToken),
    }
}
