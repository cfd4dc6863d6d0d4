#![allow(dead_code)]

use std::str::FromStr;

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, types::Json, SqlitePool};
use studyrooms::{
    auth::JwtService,
    db::{Room, User, UserProfile},
    identity::{self, NewUser},
    ids::{ChannelId, ProfileId, RoomId},
    mail::Mailer,
    members::MemberSet,
    rooms::registry::{self, NewRoom},
    AppState, MIGRATOR,
};
use time::OffsetDateTime;

/// A fresh in-memory database with the schema applied. One connection that
/// never expires, so every query sees the same database.
pub async fn pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn state(db_pool: SqlitePool) -> AppState {
    AppState {
        db_pool,
        jwt: JwtService::new(
            "test-secret-key-minimum-32-characters-long",
            "studyrooms".to_owned(),
            time::Duration::minutes(5),
            time::Duration::hours(24),
        ),
        mailer: Mailer::disabled(),
    }
}

pub async fn user(pool: &SqlitePool, username: &str) -> (User, UserProfile) {
    let mut tx = pool.begin().await.unwrap();
    let created = identity::create_user(&mut tx, NewUser {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password: "correct horse".to_owned(),
        first_name: String::new(),
        last_name: String::new(),
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
    created
}

pub async fn room(pool: &SqlitePool, owner: ProfileId, name: &str) -> Room {
    let mut conn = pool.acquire().await.unwrap();
    registry::create_room(&mut conn, owner, NewRoom {
        name: name.to_owned(),
        category: "Science".to_owned(),
        ..Default::default()
    })
    .await
    .unwrap()
}

pub async fn find_room(pool: &SqlitePool, id: RoomId) -> Room {
    let mut conn = pool.acquire().await.unwrap();
    registry::find_room(&mut conn, id).await.unwrap()
}

/// Inserts a channel row directly, the way rows looked before uuids and
/// positions were maintained. The room's channel list is not touched.
pub async fn raw_channel(
    pool: &SqlitePool,
    room: RoomId,
    owner: ProfileId,
    name: &str,
    created_at: OffsetDateTime,
    uuid: Option<ChannelId>,
    relative_id: Option<i64>,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO channels (uuid,relative_id,room_uuid,name,owner_uuid,members_uuids,color,created_at) \
         VALUES (?,?,?,?,?,?,?,?) RETURNING id"
    )
    .bind(uuid)
    .bind(relative_id)
    .bind(room)
    .bind(name)
    .bind(owner)
    .bind(Json(MemberSet::with_owner(owner)))
    .bind("rgb(0, 0, 0)")
    .bind(created_at)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub async fn set_channel_ids(pool: &SqlitePool, room: RoomId, raw: &str) {
    sqlx::query("UPDATE rooms SET channel_ids=? WHERE id=?")
        .bind(raw)
        .bind(room)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn channel_count(pool: &SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM channels")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}
