//! Database-backed tests for the engagement workflows. The capacity
//! predicates and the join-request resubmission reset live inside
//! conditional SQL statements, so they are exercised against a real
//! Postgres schema. `#[sqlx::test]` provisions an isolated database per
//! test from `DATABASE_URL` and applies `migrations/`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use proofpass_server::models::{
    ApprovalStatus, Event, JoinRequestStatus, Role, RsvpStatus, User,
};
use proofpass_server::services::engagement;
use proofpass_server::store;
use proofpass_server::store::events::NewEvent;
use proofpass_server::utils::error::AppError;

async fn insert_user(pool: &PgPool, role: Role) -> User {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, role, api_token) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind("Attendee")
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .bind(role)
    .bind(Uuid::new_v4().to_string())
    .fetch_one(pool)
    .await
    .expect("insert user")
}

async fn approved_public_event(pool: &PgPool, max_attendees: Option<i32>) -> Event {
    let creator = insert_user(pool, Role::User).await;
    let now = Utc::now();
    let event = store::events::create(
        pool,
        creator.id,
        &NewEvent {
            title: "Meetup".to_string(),
            description: None,
            is_public: true,
            max_attendees,
            start_time: now,
            end_time: now + Duration::hours(2),
            latitude: 0.0,
            longitude: 0.0,
            radius_m: 100.0,
            badge_image: None,
        },
    )
    .await
    .expect("create event");

    store::events::set_approval_status(pool, event.id, ApprovalStatus::Approved)
        .await
        .expect("approve event")
}

// ---------------------------------------------------------------------------
// RSVP capacity

#[sqlx::test]
async fn going_rsvp_past_capacity_is_rejected(pool: PgPool) {
    let event = approved_public_event(&pool, Some(1)).await;
    let first = insert_user(&pool, Role::User).await;
    let second = insert_user(&pool, Role::Admin).await;

    let taken = store::engagement::upsert_rsvp_going_capped(&pool, event.id, first.id, 1)
        .await
        .expect("first rsvp");
    assert_eq!(taken.map(|r| r.status), Some(RsvpStatus::Going));

    // The store signals a full event with zero rows; the service maps
    // that to a conflict. Admins are always RSVP-eligible, so the
    // capacity predicate is the only gate left.
    let err = engagement::set_rsvp(&pool, &second, event.id, RsvpStatus::Going)
        .await
        .unwrap_err();
    match err {
        AppError::Conflict(msg) => assert_eq!(msg, "Event is at capacity"),
        other => panic!("expected capacity conflict, got {other:?}"),
    }
}

#[sqlx::test]
async fn own_going_row_is_excluded_from_the_cap(pool: PgPool) {
    let event = approved_public_event(&pool, Some(1)).await;
    let user = insert_user(&pool, Role::User).await;

    store::engagement::upsert_rsvp_going_capped(&pool, event.id, user.id, 1)
        .await
        .expect("first rsvp")
        .expect("seat available");

    // Re-confirming GOING while holding the last seat must not count
    // against the cap.
    let again = store::engagement::upsert_rsvp_going_capped(&pool, event.id, user.id, 1)
        .await
        .expect("re-confirm");
    assert_eq!(again.map(|r| r.status), Some(RsvpStatus::Going));
}

#[sqlx::test]
async fn not_going_rows_do_not_consume_capacity(pool: PgPool) {
    let event = approved_public_event(&pool, Some(1)).await;
    let declined = insert_user(&pool, Role::User).await;
    let going = insert_user(&pool, Role::User).await;

    store::engagement::upsert_rsvp(&pool, event.id, declined.id, RsvpStatus::NotGoing)
        .await
        .expect("not-going rsvp");

    let seat = store::engagement::upsert_rsvp_going_capped(&pool, event.id, going.id, 1)
        .await
        .expect("going rsvp");
    assert!(seat.is_some());
}

// ---------------------------------------------------------------------------
// Join-request resubmission

#[sqlx::test]
async fn rejected_join_request_resubmits_in_place(pool: PgPool) {
    let event = approved_public_event(&pool, None).await;
    let user = insert_user(&pool, Role::User).await;

    let original =
        store::engagement::create_or_resubmit_join_request(&pool, event.id, user.id, Some("first"))
            .await
            .expect("create request")
            .expect("row returned");

    let rejected = store::engagement::respond_join_request(
        &pool,
        event.id,
        user.id,
        JoinRequestStatus::Rejected,
        None,
    )
    .await
    .expect("respond")
    .expect("request was pending");
    assert!(rejected.responded_at.is_some());

    // Resubmission resets the same row: status back to pending,
    // responded_at cleared, no duplicate.
    let resubmitted = store::engagement::create_or_resubmit_join_request(
        &pool,
        event.id,
        user.id,
        Some("second"),
    )
    .await
    .expect("resubmit")
    .expect("row returned");

    assert_eq!(resubmitted.id, original.id);
    assert_eq!(resubmitted.status, JoinRequestStatus::Pending);
    assert_eq!(resubmitted.message.as_deref(), Some("second"));
    assert!(resubmitted.responded_at.is_none());

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM event_join_requests WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event.id)
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .expect("count rows");
    assert_eq!(rows, 1);
}

#[sqlx::test]
async fn pending_join_request_cannot_be_duplicated(pool: PgPool) {
    let event = approved_public_event(&pool, None).await;
    let user = insert_user(&pool, Role::User).await;

    store::engagement::create_or_resubmit_join_request(&pool, event.id, user.id, None)
        .await
        .expect("create request")
        .expect("row returned");

    let duplicate =
        store::engagement::create_or_resubmit_join_request(&pool, event.id, user.id, None)
            .await
            .expect("second attempt");
    assert!(duplicate.is_none());
}

// ---------------------------------------------------------------------------
// Approval-time capacity re-check

#[sqlx::test]
async fn approval_recheck_stops_at_capacity(pool: PgPool) {
    let event = approved_public_event(&pool, Some(1)).await;
    let first = insert_user(&pool, Role::User).await;
    let second = insert_user(&pool, Role::User).await;
    for user in [&first, &second] {
        store::engagement::create_or_resubmit_join_request(&pool, event.id, user.id, None)
            .await
            .expect("create request")
            .expect("row returned");
    }

    let approved = store::engagement::respond_join_request(
        &pool,
        event.id,
        first.id,
        JoinRequestStatus::Approved,
        Some(1),
    )
    .await
    .expect("first approval");
    assert!(approved.is_some());

    let full = store::engagement::respond_join_request(
        &pool,
        event.id,
        second.id,
        JoinRequestStatus::Approved,
        Some(1),
    )
    .await
    .expect("second approval");
    assert!(full.is_none());
}

#[sqlx::test]
async fn full_event_and_settled_request_report_different_conflicts(pool: PgPool) {
    let event = approved_public_event(&pool, Some(1)).await;
    let admin = insert_user(&pool, Role::Admin).await;
    let first = insert_user(&pool, Role::User).await;
    let second = insert_user(&pool, Role::User).await;
    for user in [&first, &second] {
        store::engagement::create_or_resubmit_join_request(&pool, event.id, user.id, None)
            .await
            .expect("create request")
            .expect("row returned");
    }

    let approved = engagement::respond_join_request(
        &pool,
        &admin,
        event.id,
        first.id,
        JoinRequestStatus::Approved,
    )
    .await
    .expect("first approval");
    assert_eq!(approved.status, JoinRequestStatus::Approved);

    // A still-pending request denied by the capacity re-check reports the
    // event as full, not as already responded.
    let err = engagement::respond_join_request(
        &pool,
        &admin,
        event.id,
        second.id,
        JoinRequestStatus::Approved,
    )
    .await
    .unwrap_err();
    match err {
        AppError::Conflict(msg) => assert_eq!(msg, "Event is at capacity"),
        other => panic!("expected capacity conflict, got {other:?}"),
    }

    // A request that already settled reports the settled state instead.
    let err = engagement::respond_join_request(
        &pool,
        &admin,
        event.id,
        first.id,
        JoinRequestStatus::Rejected,
    )
    .await
    .unwrap_err();
    match err {
        AppError::Conflict(msg) => {
            assert_eq!(msg, "Join request has already been responded to")
        }
        other => panic!("expected responded conflict, got {other:?}"),
    }
}
