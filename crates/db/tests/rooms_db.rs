//! Storage-level tests for the rooms engine: capacity under concurrency,
//! keyset pagination, heartbeats, and refresh-session rotation.

use chrono::{Duration, Utc};
use futures::future::join_all;
use sqlx::PgPool;
use uuid::Uuid;

use huddle_db::models::session::CreateSession;
use huddle_db::models::user::CreateUser;
use huddle_db::repositories::{
    ChatRepo, JoinOutcome, ParticipantRepo, RoomRepo, SessionRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// N concurrent joins against a room of capacity M admit exactly M; the
/// rest see RoomFull and the roster never exceeds M.
#[sqlx::test]
async fn concurrent_joins_never_exceed_capacity(pool: PgPool) {
    let room = RoomRepo::create(&pool, "contended", 2)
        .await
        .expect("room creation should succeed");

    let tasks: Vec<_> = (1..=6)
        .map(|user_id| {
            let pool = pool.clone();
            let room_id = room.id;
            tokio::spawn(async move { ParticipantRepo::join(&pool, room_id, user_id).await })
        })
        .collect();

    let mut joined = 0;
    let mut full = 0;
    for result in join_all(tasks).await {
        match result.expect("task should not panic").expect("join should not error") {
            JoinOutcome::Joined => joined += 1,
            JoinOutcome::RoomFull => full += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(joined, 2, "exactly capacity-many joins succeed");
    assert_eq!(full, 4, "every other join sees RoomFull");

    let roster = ParticipantRepo::list_by_room(&pool, room.id)
        .await
        .expect("listing should succeed");
    assert_eq!(roster.len(), 2, "the roster never exceeds capacity");
}

/// A duplicate join for the same user changes nothing.
#[sqlx::test]
async fn repeat_join_is_detected(pool: PgPool) {
    let room = RoomRepo::create(&pool, "g", 5)
        .await
        .expect("room creation should succeed");

    assert_eq!(
        ParticipantRepo::join(&pool, room.id, 7).await.unwrap(),
        JoinOutcome::Joined
    );
    assert_eq!(
        ParticipantRepo::join(&pool, room.id, 7).await.unwrap(),
        JoinOutcome::AlreadyJoined
    );

    assert!(ParticipantRepo::exists(&pool, room.id, 7).await.unwrap());
    let roster = ParticipantRepo::list_by_room(&pool, room.id).await.unwrap();
    assert_eq!(roster.len(), 1);
}

/// Joining a room that does not exist reports RoomNotFound.
#[sqlx::test]
async fn join_unknown_room(pool: PgPool) {
    let outcome = ParticipantRepo::join(&pool, Uuid::new_v4(), 1)
        .await
        .expect("join should not error");
    assert_eq!(outcome, JoinOutcome::RoomNotFound);
}

/// Leave and heartbeat report missing memberships via their boolean.
#[sqlx::test]
async fn leave_and_heartbeat_on_missing_membership(pool: PgPool) {
    let room = RoomRepo::create(&pool, "g", 5).await.unwrap();

    assert!(!ParticipantRepo::leave(&pool, room.id, 42).await.unwrap());
    assert!(!ParticipantRepo::touch_heartbeat(&pool, room.id, 42)
        .await
        .unwrap());

    ParticipantRepo::join(&pool, room.id, 42).await.unwrap();
    assert!(ParticipantRepo::touch_heartbeat(&pool, room.id, 42)
        .await
        .unwrap());
    assert!(ParticipantRepo::leave(&pool, room.id, 42).await.unwrap());
}

// ---------------------------------------------------------------------------
// Chat history pagination
// ---------------------------------------------------------------------------

/// Chained history pages visit every message exactly once, newest first.
#[sqlx::test]
async fn history_visits_every_message_once(pool: PgPool) {
    let room = RoomRepo::create(&pool, "g", 5).await.unwrap();

    let mut inserted = Vec::new();
    for i in 0..7 {
        let message = ChatRepo::save(&pool, room.id, 1, &format!("m{i}"), None)
            .await
            .expect("saving should succeed");
        inserted.push(message.id);
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let decoded = match &cursor {
            Some(token) => huddle_db::pagination::decode_cursor(token)
                .expect("our own cursor should decode"),
            None => None,
        };
        let (page, next) = ChatRepo::history(&pool, room.id, 3, decoded.as_ref())
            .await
            .expect("history should succeed");

        assert!(page.len() <= 3);
        for message in &page {
            seen.push((message.created_at, message.id));
        }
        match next {
            Some(token) => cursor = Some(token),
            None => break,
        }
    }

    assert_eq!(seen.len(), 7, "every message appears exactly once");
    for window in seen.windows(2) {
        assert!(window[0] > window[1], "strictly descending (created_at, id)");
    }
    let mut ids: Vec<Uuid> = seen.iter().map(|(_, id)| *id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 7, "no duplicates across pages");
    for id in inserted {
        assert!(ids.contains(&id));
    }
}

/// Messages sharing a timestamp are paged completely via the id tie-break.
#[sqlx::test]
async fn history_tie_breaks_equal_timestamps(pool: PgPool) {
    let room = RoomRepo::create(&pool, "g", 5).await.unwrap();

    let shared = Utc::now();
    for i in 0..4 {
        sqlx::query(
            "INSERT INTO room_messages (room_id, user_id, text, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(room.id)
        .bind(1i64)
        .bind(format!("tied-{i}"))
        .bind(shared)
        .execute(&pool)
        .await
        .expect("insert should succeed");
    }

    let (first, next) = ChatRepo::history(&pool, room.id, 2, None).await.unwrap();
    assert_eq!(first.len(), 2);
    let next = next.expect("a full page emits a cursor");

    let decoded = huddle_db::pagination::decode_cursor(&next)
        .expect("cursor should decode")
        .expect("cursor should be present");
    let (second, rest) = ChatRepo::history(&pool, room.id, 2, Some(&decoded))
        .await
        .unwrap();
    assert_eq!(second.len(), 2);

    let mut all: Vec<Uuid> = first.iter().chain(second.iter()).map(|m| m.id).collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 4, "tie-break must not skip or repeat rows");

    // Exactly four rows exist, so the second full page is the last one and
    // a third page is empty.
    if let Some(token) = rest {
        let decoded = huddle_db::pagination::decode_cursor(&token).unwrap();
        let (third, _) = ChatRepo::history(&pool, room.id, 2, decoded.as_ref())
            .await
            .unwrap();
        assert!(third.is_empty());
    }
}

/// History on an empty room is an empty page with no cursor.
#[sqlx::test]
async fn history_of_empty_room(pool: PgPool) {
    let room = RoomRepo::create(&pool, "g", 5).await.unwrap();
    let (page, next) = ChatRepo::history(&pool, room.id, 50, None).await.unwrap();
    assert!(page.is_empty());
    assert!(next.is_none());
}

// ---------------------------------------------------------------------------
// Room listing
// ---------------------------------------------------------------------------

/// Room listing emits a cursor only on full pages.
#[sqlx::test]
async fn room_list_cursor_only_on_full_pages(pool: PgPool) {
    for i in 0..3 {
        RoomRepo::create(&pool, &format!("room-{i}"), 5).await.unwrap();
    }

    let (page, next) = RoomRepo::list(&pool, 3, None).await.unwrap();
    assert_eq!(page.len(), 3);
    assert!(next.is_some(), "a full page emits a cursor");

    let decoded = huddle_db::pagination::decode_cursor(&next.unwrap())
        .unwrap()
        .unwrap();
    let (rest, next) = RoomRepo::list(&pool, 3, Some(&decoded)).await.unwrap();
    assert!(rest.is_empty());
    assert!(next.is_none(), "a short page means end of stream");
}

// ---------------------------------------------------------------------------
// Refresh sessions
// ---------------------------------------------------------------------------

async fn create_test_user(pool: &PgPool, email: &str) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$test-hash".to_string(),
            display_name: None,
            avatar_url: None,
        },
    )
    .await
    .expect("user creation should succeed");
    user.id
}

/// Rotation atomically replaces the old session with the new one.
#[sqlx::test]
async fn rotate_swaps_sessions(pool: PgPool) {
    let user_id = create_test_user(&pool, "rotator@test.com").await;

    let old = SessionRepo::create(
        &pool,
        &CreateSession {
            user_id,
            token_hash: "a".repeat(64),
            expires_at: Utc::now() + Duration::days(30),
            user_agent: None,
            ip: None,
        },
    )
    .await
    .expect("session creation should succeed");

    let new = SessionRepo::rotate(
        &pool,
        old.id,
        &CreateSession {
            user_id,
            token_hash: "b".repeat(64),
            expires_at: Utc::now() + Duration::days(30),
            user_agent: None,
            ip: None,
        },
    )
    .await
    .expect("rotation should not error")
    .expect("a live session should rotate");

    assert!(SessionRepo::find_by_token_hash(&pool, &"a".repeat(64))
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        SessionRepo::find_by_token_hash(&pool, &"b".repeat(64))
            .await
            .unwrap()
            .expect("new session should exist")
            .id,
        new.id
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "exactly one session survives a rotation");
}

/// Two concurrent rotations of the same session mint exactly one
/// replacement: the loser's delete removes no row and its insert rolls
/// back.
#[sqlx::test]
async fn concurrent_rotations_have_one_winner(pool: PgPool) {
    let user_id = create_test_user(&pool, "racer@test.com").await;

    let old = SessionRepo::create(
        &pool,
        &CreateSession {
            user_id,
            token_hash: "contested".to_string(),
            expires_at: Utc::now() + Duration::days(30),
            user_agent: None,
            ip: None,
        },
    )
    .await
    .expect("session creation should succeed");
    let old_id = old.id;

    let tasks: Vec<_> = ["winner-a", "winner-b"]
        .into_iter()
        .map(|hash| {
            let pool = pool.clone();
            tokio::spawn(async move {
                SessionRepo::rotate(
                    &pool,
                    old_id,
                    &CreateSession {
                        user_id,
                        token_hash: hash.to_string(),
                        expires_at: Utc::now() + Duration::days(30),
                        user_agent: None,
                        ip: None,
                    },
                )
                .await
            })
        })
        .collect();

    let mut winners = 0;
    for result in join_all(tasks).await {
        let outcome = result
            .expect("task should not panic")
            .expect("rotation should not error");
        if outcome.is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one rotation wins the race");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "one presented token yields one live session");

    assert!(
        SessionRepo::find_by_token_hash(&pool, "contested")
            .await
            .unwrap()
            .is_none(),
        "the presented session must be consumed"
    );
}

/// Multiple concurrent sessions per user are supported (multi-device);
/// the sweep only removes the expired ones.
#[sqlx::test]
async fn sweep_deletes_only_expired_sessions(pool: PgPool) {
    let user_id = create_test_user(&pool, "sweeper@test.com").await;

    SessionRepo::create(
        &pool,
        &CreateSession {
            user_id,
            token_hash: "live".to_string(),
            expires_at: Utc::now() + Duration::days(30),
            user_agent: Some("phone".to_string()),
            ip: None,
        },
    )
    .await
    .unwrap();
    SessionRepo::create(
        &pool,
        &CreateSession {
            user_id,
            token_hash: "stale".to_string(),
            expires_at: Utc::now() - Duration::days(1),
            user_agent: Some("laptop".to_string()),
            ip: None,
        },
    )
    .await
    .unwrap();

    let deleted = SessionRepo::delete_expired(&pool, Utc::now()).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(SessionRepo::find_by_token_hash(&pool, "live")
        .await
        .unwrap()
        .is_some());
    assert!(SessionRepo::find_by_token_hash(&pool, "stale")
        .await
        .unwrap()
        .is_none());
}
