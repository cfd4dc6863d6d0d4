mod common;

use studyrooms::{
    channels::registry::{self as channels, NewChannel},
    db::{self, ChannelRef, DEFAULT_CHANNEL_COLOR},
    ids::{ChannelId, ProfileId},
    maintenance::{
        run_job, run_task, BackfillChannelUuids, DeleteChannels, PopulateRooms,
        ProvisionDefaultChannels, PruneChannelRefs, RecomputePositions, SyncOwnerMembership, Task,
    },
    members::Membership,
};
use time::macros::datetime;

#[tokio::test]
async fn physics_101_gets_an_intro_channel() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Physics 101").await;

    let report = run_job(&pool, &ProvisionDefaultChannels).await.unwrap();
    assert_eq!(report.updated, 1);
    assert!(report.is_clean());

    let mut conn = pool.acquire().await.unwrap();
    let created = channels::channels_in_room(&mut conn, room.id).await.unwrap();
    assert_eq!(created.len(), 1);

    let intro = &created[0];
    assert_eq!(intro.name, "Intro");
    assert_eq!(intro.owner_uuid, u1.uuid);
    assert_eq!(intro.members().iter().copied().collect::<Vec<_>>(), vec![u1.uuid]);
    assert_eq!(intro.color, DEFAULT_CHANNEL_COLOR);
    assert_eq!(intro.relative_id, Some(1));
    drop(conn);

    let room = common::find_room(&pool, room.id).await;
    assert_eq!(*room.channel_ids, vec![ChannelRef::Uuid(intro.uuid.unwrap())]);
    assert!(room.is_member(&u1.uuid));
    assert!(room.members().contains(&u1.uuid));
}

#[tokio::test]
async fn provisioning_twice_creates_nothing_new() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Physics 101").await;

    run_job(&pool, &ProvisionDefaultChannels).await.unwrap();
    let before = common::find_room(&pool, room.id).await.channel_ids.0.clone();

    let report = run_job(&pool, &ProvisionDefaultChannels).await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, 1);

    assert_eq!(common::channel_count(&pool).await, 1);
    assert_eq!(common::find_room(&pool, room.id).await.channel_ids.0, before);
}

#[tokio::test]
async fn missing_owner_is_skipped_and_the_rest_processed() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let orphan = common::room(&pool, ProfileId::new(), "Orphaned").await;
    let room = common::room(&pool, u1.uuid, "World History").await;

    let report = run_job(&pool, &ProvisionDefaultChannels).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.contains("Orphaned"));
    assert!(report.failed.is_empty());

    assert!(common::find_room(&pool, orphan.id).await.channel_ids.is_empty());
    assert_eq!(common::find_room(&pool, room.id).await.channel_ids.len(), 1);
}

#[tokio::test]
async fn positions_follow_creation_order() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Calculus").await;

    let third = common::raw_channel(&pool, room.id, u1.uuid, "c", datetime!(2023-06-15 10:00 UTC), None, Some(1)).await;
    let first = common::raw_channel(&pool, room.id, u1.uuid, "a", datetime!(2023-06-13 10:00 UTC), None, Some(2)).await;
    let second = common::raw_channel(&pool, room.id, u1.uuid, "b", datetime!(2023-06-14 10:00 UTC), None, None).await;

    let report = run_job(&pool, &RecomputePositions).await.unwrap();
    assert_eq!(report.updated, 1);

    let positions = positions_of(&pool, &[first, second, third]).await;
    assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);

    // a second pass changes nothing
    let report = run_job(&pool, &RecomputePositions).await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(positions_of(&pool, &[first, second, third]).await, positions);
}

#[tokio::test]
async fn equal_timestamps_are_ordered_by_row_id() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Biology").await;
    let at = datetime!(2023-06-15 09:30 UTC);

    let a = common::raw_channel(&pool, room.id, u1.uuid, "a", at, None, Some(2)).await;
    let b = common::raw_channel(&pool, room.id, u1.uuid, "b", at, None, Some(1)).await;

    run_job(&pool, &RecomputePositions).await.unwrap();
    assert_eq!(positions_of(&pool, &[a, b]).await, vec![Some(1), Some(2)]);
}

async fn positions_of(pool: &sqlx::SqlitePool, ids: &[i64]) -> Vec<Option<i64>> {
    let mut conn = pool.acquire().await.unwrap();
    let mut positions = vec![];
    for id in ids {
        let channel = channels::find_channel_by_row(&mut conn, *id).await.unwrap().unwrap();
        positions.push(channel.relative_id);
    }
    positions
}

#[tokio::test]
async fn backfill_keeps_existing_uuids() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Art History").await;
    let existing = ChannelId::new();

    let kept = common::raw_channel(&pool, room.id, u1.uuid, "kept", db::now(), Some(existing), Some(1)).await;
    let missing = common::raw_channel(&pool, room.id, u1.uuid, "missing", db::now(), None, Some(2)).await;

    let report = run_job(&pool, &BackfillChannelUuids).await.unwrap();
    assert_eq!(report.updated, 1);

    let mut conn = pool.acquire().await.unwrap();
    let kept = channels::find_channel_by_row(&mut conn, kept).await.unwrap().unwrap();
    let missing = channels::find_channel_by_row(&mut conn, missing).await.unwrap().unwrap();
    assert_eq!(kept.uuid, Some(existing));
    let assigned = missing.uuid.expect("uuid was assigned");
    assert_ne!(assigned, existing);
    drop(conn);

    let report = run_job(&pool, &BackfillChannelUuids).await.unwrap();
    assert_eq!(report.total(), 0);

    let mut conn = pool.acquire().await.unwrap();
    let missing = channels::find_channel_by_row(&mut conn, missing.id).await.unwrap().unwrap();
    assert_eq!(missing.uuid, Some(assigned));
}

#[tokio::test]
async fn stale_integer_refs_are_replaced() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Literature Circle").await;
    let uuid = ChannelId::new();
    common::raw_channel(&pool, room.id, u1.uuid, "general", db::now(), Some(uuid), Some(1)).await;
    common::set_channel_ids(&pool, room.id, "[3, 7]").await;

    assert!(common::find_room(&pool, room.id).await.has_stale_channel_refs());

    let report = run_job(&pool, &PruneChannelRefs).await.unwrap();
    assert_eq!(report.updated, 1);

    let room = common::find_room(&pool, room.id).await;
    assert_eq!(*room.channel_ids, vec![ChannelRef::Uuid(uuid)]);

    let report = run_job(&pool, &PruneChannelRefs).await.unwrap();
    assert_eq!(report.unchanged, 1);
}

#[tokio::test]
async fn update_room_members_replaces_stale_list_with_intro() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Statistics").await;
    common::set_channel_ids(&pool, room.id, "[1, 2]").await;

    let reports = run_task(&pool, Task::UpdateRoomMembers).await.unwrap();
    assert_eq!(reports.len(), 2);

    let room = common::find_room(&pool, room.id).await;
    assert_eq!(room.channel_ids.len(), 1);
    assert!(!room.has_stale_channel_refs());
    assert_eq!(common::channel_count(&pool).await, 1);
}

#[tokio::test]
async fn owners_are_put_back_into_member_sets() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let room = common::room(&pool, u1.uuid, "Physics 101").await;
    let channel = common::raw_channel(&pool, room.id, u1.uuid, "general", db::now(), None, Some(1)).await;

    sqlx::query("UPDATE rooms SET members_uuids='[]'").execute(&pool).await.unwrap();
    sqlx::query("UPDATE channels SET members_uuids='[]'").execute(&pool).await.unwrap();

    let report = run_job(&pool, &SyncOwnerMembership).await.unwrap();
    assert_eq!(report.updated, 1);

    assert!(common::find_room(&pool, room.id).await.members().contains(&u1.uuid));
    let mut conn = pool.acquire().await.unwrap();
    let channel = channels::find_channel_by_row(&mut conn, channel).await.unwrap().unwrap();
    assert!(channel.members().contains(&u1.uuid));
}

#[tokio::test]
async fn delete_channels_empties_rooms() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let mut room = common::room(&pool, u1.uuid, "Physics 101").await;

    let mut conn = pool.acquire().await.unwrap();
    for name in ["general", "homework"] {
        channels::create_channel(&mut conn, &mut room, NewChannel {
            name: name.to_owned(),
            owner: u1.uuid,
            color: DEFAULT_CHANNEL_COLOR.to_owned(),
            created_at: db::now(),
        })
        .await
        .unwrap();
    }
    drop(conn);

    let report = run_job(&pool, &DeleteChannels).await.unwrap();
    assert_eq!(report.updated, 2);
    assert_eq!(common::channel_count(&pool).await, 0);
    assert!(common::find_room(&pool, room.id).await.channel_ids.is_empty());
}

#[tokio::test]
async fn populate_rooms_needs_admin_and_runs_once() {
    let pool = common::pool().await;

    let report = run_job(&pool, &PopulateRooms).await.unwrap();
    assert_eq!(report.skipped.len(), 8);

    let (_, admin) = common::user(&pool, "admin").await;
    let report = run_job(&pool, &PopulateRooms).await.unwrap();
    assert_eq!(report.updated, 8);

    let report = run_job(&pool, &PopulateRooms).await.unwrap();
    assert_eq!(report.unchanged, 8);

    let mut conn = pool.acquire().await.unwrap();
    let rooms = studyrooms::rooms::registry::rooms_for_profile(&mut conn, admin.uuid).await.unwrap();
    assert_eq!(rooms.len(), 8);
    let physics = rooms.iter().find(|r| r.name == "Physics 101").unwrap();
    assert_eq!(physics.category, "Science");
    assert_eq!(physics.latest_message.as_deref(), Some("Can someone explain quantum entanglement?"));
    assert!(physics.members().contains(&admin.uuid));
}

#[tokio::test]
async fn all_leaves_every_room_consistent() {
    let pool = common::pool().await;
    let (_, u1) = common::user(&pool, "u1").await;
    let legacy = common::room(&pool, u1.uuid, "Legacy").await;
    let empty = common::room(&pool, u1.uuid, "Empty").await;

    common::raw_channel(&pool, legacy.id, u1.uuid, "old", datetime!(2023-01-01 0:00 UTC), None, None).await;
    common::raw_channel(&pool, legacy.id, u1.uuid, "older", datetime!(2022-01-01 0:00 UTC), None, None).await;
    common::set_channel_ids(&pool, legacy.id, "[1, 2]").await;

    let reports = run_task(&pool, Task::All).await.unwrap();
    assert!(reports.iter().all(|r| r.failed.is_empty()));

    let mut conn = pool.acquire().await.unwrap();
    for id in [legacy.id, empty.id] {
        let room = studyrooms::rooms::registry::find_room(&mut conn, id).await.unwrap();
        let in_room = channels::channels_in_room(&mut conn, id).await.unwrap();

        assert!(room.members().contains(&room.owner_uuid));
        assert_eq!(room.channel_ids.len(), in_room.len());
        for (channel, position) in in_room.iter().zip(1..) {
            assert!(room.channel_uuids().any(|u| Some(u) == channel.uuid));
            assert_eq!(channel.relative_id, Some(position));
            assert!(channel.members().contains(&channel.owner_uuid));
        }
    }

    // the legacy room kept its two channels, oldest first, and got no intro
    let legacy_channels = channels::channels_in_room(&mut conn, legacy.id).await.unwrap();
    let names: Vec<_> = legacy_channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["older", "old"]);
    assert_eq!(channels::channels_in_room(&mut conn, empty.id).await.unwrap()[0].name, "Intro");
}
