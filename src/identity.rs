//! Users, their profiles, and translation between the two kinds of user id.

use sqlx::SqliteConnection;

use crate::appresult::is_unique_violation;
use crate::auth::password;
use crate::db::{self, User, UserProfile};
use crate::ids::{ProfileId, UserId};
use crate::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id,username,email,password_hash,first_name,last_name,is_active,is_staff,date_joined";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Creates a user and its profile. Run it inside a transaction so a failed
/// profile insert leaves no user row behind.
pub async fn create_user(conn: &mut SqliteConnection, new: NewUser) -> AppResult<(User, UserProfile)> {
    if find_user_by_email(&mut *conn, &new.email).await?.is_some() {
        return Err(AppError::validation("A user with this email already exists."));
    }
    if username_taken(&mut *conn, &new.username).await? {
        return Err(AppError::validation("A user with that username already exists."));
    }

    let password_hash = password::hash_password(&new.password)?;
    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (username,email,password_hash,first_name,last_name,date_joined) \
         VALUES (?,?,?,?,?,?) RETURNING {USER_COLUMNS}"
    ))
    .bind(&new.username)
    .bind(&new.email)
    .bind(password_hash)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(db::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::validation("A user with this username or email already exists.")
        } else {
            e.into()
        }
    })?;

    let profile = create_profile(&mut *conn, user.id).await?;
    tracing::info!("adding @{}#{}, profile {}", user.username, user.id, profile.uuid);

    Ok((user, profile))
}

/// Issues the profile for `user_id`. A user never gets a second one.
pub async fn create_profile(conn: &mut SqliteConnection, user_id: UserId) -> AppResult<UserProfile> {
    sqlx::query_as("INSERT INTO user_profiles (user_id,uuid) VALUES (?,?) RETURNING id,user_id,uuid")
        .bind(user_id)
        .bind(ProfileId::new())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User profile already exists.".to_owned())
            } else {
                e.into()
            }
        })
}

pub async fn find_user(conn: &mut SqliteConnection, id: UserId) -> AppResult<User> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id=?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("user"))
}

pub async fn find_user_by_username(conn: &mut SqliteConnection, username: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username=?"))
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?
    )
}

pub async fn find_user_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email=?"))
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?
    )
}

pub async fn username_taken(conn: &mut SqliteConnection, username: &str) -> AppResult<bool> {
    Ok(
        sqlx::query("SELECT 1 FROM users WHERE username=?")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?
            .is_some()
    )
}

pub async fn list_users(conn: &mut SqliteConnection) -> AppResult<Vec<User>> {
    Ok(
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&mut *conn)
            .await?
    )
}

pub async fn update_user(conn: &mut SqliteConnection, id: UserId, changes: UserChanges) -> AppResult<User> {
    let mut user = find_user(&mut *conn, id).await?;

    if let Some(username) = changes.username {
        user.username = username;
    }
    if let Some(email) = changes.email {
        user.email = email;
    }
    if let Some(first_name) = changes.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = changes.last_name {
        user.last_name = last_name;
    }
    if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
        user.password_hash = password::hash_password(&password)?;
    }

    sqlx::query("UPDATE users SET username=?,email=?,first_name=?,last_name=?,password_hash=? WHERE id=?")
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("A user with this username or email already exists.")
            } else {
                e.into()
            }
        })?;

    Ok(user)
}

/// Deletes the user; the profile goes with it. Rooms and channels keep the
/// profile uuid in their owner/member fields.
pub async fn delete_user(conn: &mut SqliteConnection, id: UserId) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE id=?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user"));
    }
    Ok(())
}

/// Checks `password` against the stored hash of `username`.
pub async fn authenticate(conn: &mut SqliteConnection, username: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_owned());

    let user = find_user_by_username(&mut *conn, username).await?.ok_or_else(invalid)?;
    if !user.is_active || !password::verify_password(password, &user.password_hash)? {
        return Err(invalid());
    }
    Ok(user)
}

pub async fn profile_for_user(conn: &mut SqliteConnection, user_id: UserId) -> AppResult<UserProfile> {
    sqlx::query_as("SELECT id,user_id,uuid FROM user_profiles WHERE user_id=?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))
}

/// Internal user id to profile uuid.
pub async fn profile_uuid_for_user(conn: &mut SqliteConnection, user_id: UserId) -> AppResult<ProfileId> {
    Ok(profile_for_user(conn, user_id).await?.uuid)
}

/// Profile uuid back to the user that owns it.
pub async fn user_for_profile(conn: &mut SqliteConnection, profile: ProfileId) -> AppResult<User> {
    sqlx::query_as(&format!(
        "SELECT u.{} FROM users u JOIN user_profiles p ON p.user_id=u.id WHERE p.uuid=?",
        USER_COLUMNS.replace(',', ",u.")
    ))
    .bind(profile)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(format!("profile {profile}")))
}

pub async fn profile_exists(conn: &mut SqliteConnection, profile: ProfileId) -> AppResult<bool> {
    Ok(
        sqlx::query("SELECT 1 FROM user_profiles WHERE uuid=?")
            .bind(profile)
            .fetch_optional(&mut *conn)
            .await?
            .is_some()
    )
}
