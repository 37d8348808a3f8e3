//! User store: account creation, credential checks and profile updates.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::user::{self, Column as UserCol, Entity as User};
use crate::password::{hash_blocking, verify_blocking};
use crate::settings::PasswordCfg;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Fields to change on an existing account; `None` leaves a field untouched.
#[derive(Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Trims and lower-cases an address so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    cfg: &PasswordCfg,
    new: NewUser<'_>,
) -> Result<user::Model, AppError> {
    insert_user(db, cfg, new, false).await
}

pub async fn create_superuser<C: ConnectionTrait>(
    db: &C,
    cfg: &PasswordCfg,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    let new = NewUser {
        email,
        password,
        name: "",
    };
    insert_user(db, cfg, new, true).await
}

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    cfg: &PasswordCfg,
    new: NewUser<'_>,
    elevated: bool,
) -> Result<user::Model, AppError> {
    let email = normalize_email(new.email);
    if email.is_empty() {
        return Err(AppError::field("email", "Users must have an email address."));
    }
    ensure_email_free(db, &email, None).await?;

    let now = Utc::now();
    let hash = hash_blocking(new.password, cfg).await?;

    let created = user::ActiveModel {
        id: NotSet,
        email: Set(email),
        name: Set(new.name.trim().to_owned()),
        password_hash: Set(hash),
        is_active: Set(true),
        is_staff: Set(elevated),
        is_superuser: Set(elevated),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(duplicate_email)?;

    info!(user_id = created.id, superuser = elevated, "user created");
    Ok(created)
}

/// Verifies credentials and stamps `last_login`. Unknown email, wrong
/// password and inactive accounts are indistinguishable to the caller.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    let email = normalize_email(email);
    let Some(found) = User::find()
        .filter(UserCol::Email.eq(&email))
        .one(db)
        .await?
    else {
        warn!("login for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !found.is_active || !check_password(&found, password).await {
        warn!(user_id = found.id, "login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let mut am = found.into_active_model();
    am.last_login = Set(Some(Utc::now()));
    Ok(am.update(db).await?)
}

/// Argon2 verification runs on the blocking pool.
pub async fn check_password(user: &user::Model, password: &str) -> bool {
    verify_blocking(&user.password_hash, password)
        .await
        .unwrap_or(false)
}

pub async fn update_user<C: ConnectionTrait>(
    db: &C,
    cfg: &PasswordCfg,
    found: user::Model,
    changes: UserChanges,
) -> Result<user::Model, AppError> {
    let id = found.id;
    let mut am = found.into_active_model();

    if let Some(email) = changes.email {
        let email = normalize_email(&email);
        if email.is_empty() {
            return Err(AppError::field("email", "This field may not be blank."));
        }
        ensure_email_free(db, &email, Some(id)).await?;
        am.email = Set(email);
    }
    if let Some(name) = changes.name {
        am.name = Set(name.trim().to_owned());
    }
    if let Some(password) = changes.password {
        am.password_hash = Set(hash_blocking(&password, cfg).await?);
    }
    am.updated_at = Set(Utc::now());

    let updated = am.update(db).await.map_err(duplicate_email)?;
    info!(user_id = id, "user updated");
    Ok(updated)
}

async fn ensure_email_free<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except: Option<i64>,
) -> Result<(), AppError> {
    let mut query = User::find().filter(UserCol::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(UserCol::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(duplicate());
    }
    Ok(())
}

fn duplicate() -> AppError {
    AppError::field("email", "user with this email already exists.")
}

fn duplicate_email(err: sea_orm::DbErr) -> AppError {
    if AppError::is_unique_violation(&err) {
        duplicate()
    } else {
        AppError::Db(err)
    }
}
