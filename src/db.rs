//! Rows of the identity, room and channel stores.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use time::OffsetDateTime;

use crate::ids::{ChannelId, ProfileId, RoomId, UserId};
use crate::members::{MemberSet, Membership};

/// Color given to channels created by maintenance jobs.
pub const DEFAULT_CHANNEL_COLOR: &str = "rgb(216, 210, 123)";

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub uuid: ProfileId,

    // unique: user_id
    // unique: uuid
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// One entry of `Room::channel_ids`.
///
/// Older rows may still carry integer channel ids; those decode as `Stale`
/// and never survive a write through [`Room::link_channel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    Uuid(ChannelId),
    Stale(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub visibility: Visibility,
    pub active: bool,
    pub owner_uuid: ProfileId,
    pub members_uuids: Json<MemberSet>,
    pub channel_ids: Json<Vec<ChannelRef>>,
    pub latest_message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_active: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl Room {
    pub fn channel_uuids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channel_ids.iter().filter_map(|r| match r {
            ChannelRef::Uuid(id) => Some(*id),
            ChannelRef::Stale(_) => None,
        })
    }

    pub fn has_stale_channel_refs(&self) -> bool {
        self.channel_ids.iter().any(|r| matches!(r, ChannelRef::Stale(_)))
    }

    /// Appends `channel` to the channel list, dropping stale entries first.
    /// Returns `true` if the list changed.
    pub fn link_channel(&mut self, channel: ChannelId) -> bool {
        let before = self.channel_ids.len();
        self.channel_ids.retain(|r| matches!(r, ChannelRef::Uuid(_)));
        let pruned = self.channel_ids.len() != before;

        let entry = ChannelRef::Uuid(channel);
        if self.channel_ids.contains(&entry) {
            return pruned;
        }
        self.channel_ids.push(entry);
        true
    }

    pub fn unlink_channel(&mut self, channel: ChannelId) -> bool {
        let before = self.channel_ids.len();
        self.channel_ids.retain(|r| *r != ChannelRef::Uuid(channel));
        self.channel_ids.len() != before
    }
}

impl Membership for Room {
    fn owner(&self) -> ProfileId {
        self.owner_uuid
    }

    fn members(&self) -> &MemberSet {
        &self.members_uuids
    }

    fn members_mut(&mut self) -> &mut MemberSet {
        &mut self.members_uuids
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Channel {
    pub id: i64,
    pub uuid: Option<ChannelId>,
    pub relative_id: Option<i64>,
    pub room_uuid: RoomId,
    pub name: String,
    pub owner_uuid: ProfileId,
    pub members_uuids: Json<MemberSet>,
    pub color: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    // unique: uuid
    // unique: room_uuid, relative_id
}

impl Membership for Channel {
    fn owner(&self) -> ProfileId {
        self.owner_uuid
    }

    fn members(&self) -> &MemberSet {
        &self.members_uuids
    }

    fn members_mut(&mut self) -> &mut MemberSet {
        &mut self.members_uuids
    }
}
