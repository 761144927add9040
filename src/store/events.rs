use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ApprovalStatus, Event, User};

pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub max_attendees: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub badge_image: Option<String>,
}

#[derive(Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub max_attendees: Option<Option<i32>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<f64>,
    pub badge_image: Option<String>,
}

pub async fn create(pool: &PgPool, created_by: Uuid, new: &NewEvent) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events
            (created_by, title, description, is_public, max_attendees,
             start_time, end_time, latitude, longitude, radius_m, badge_image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(created_by)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.is_public)
    .bind(new.max_attendees)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.radius_m)
    .bind(&new.badge_image)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: Uuid, patch: &EventPatch) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        UPDATE events SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            is_public = COALESCE($4, is_public),
            max_attendees = CASE WHEN $5 THEN $6 ELSE max_attendees END,
            start_time = COALESCE($7, start_time),
            end_time = COALESCE($8, end_time),
            latitude = COALESCE($9, latitude),
            longitude = COALESCE($10, longitude),
            radius_m = COALESCE($11, radius_m),
            badge_image = COALESCE($12, badge_image),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(patch.is_public)
    .bind(patch.max_attendees.is_some())
    .bind(patch.max_attendees.flatten())
    .bind(patch.start_time)
    .bind(patch.end_time)
    .bind(patch.latitude)
    .bind(patch.longitude)
    .bind(patch.radius_m)
    .bind(&patch.badge_image)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn set_approval_status(
    pool: &PgPool,
    id: Uuid,
    status: ApprovalStatus,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "UPDATE events SET approval_status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_one(pool)
    .await
}

/// Events the viewer is allowed to see: approved public events, private
/// events they hold an accepted invite for, their own events, and (for
/// admins) everything.
pub async fn list_visible(pool: &PgPool, viewer: &User) -> Result<Vec<Event>, sqlx::Error> {
    if viewer.is_admin() {
        return sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY start_time DESC")
            .fetch_all(pool)
            .await;
    }

    sqlx::query_as::<_, Event>(
        r#"
        SELECT e.* FROM events e
        WHERE e.created_by = $1
           OR (e.approval_status = 'approved' AND e.is_public)
           OR (e.approval_status = 'approved' AND NOT e.is_public AND EXISTS (
                SELECT 1 FROM event_invites i
                WHERE i.event_id = e.id AND i.user_id = $1 AND i.status = 'accepted'))
        ORDER BY e.start_time DESC
        "#,
    )
    .bind(viewer.id)
    .fetch_all(pool)
    .await
}
