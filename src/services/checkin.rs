//! The check-in gate: approval, time window, de-duplication, geofence and
//! authorization, evaluated in a fixed priority order so that status
//! polling always reports the most significant failing reason.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::geo;
use crate::models::{Event, EventAttendance, RsvpStatus, User};
use crate::services::entitlement;
use crate::store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum CheckInDenial {
    EventNotApproved,
    NotStarted { starts_at: DateTime<Utc> },
    Ended { ended_at: DateTime<Utc> },
    AlreadyCheckedIn,
    OutOfRadius { distance_m: f64, radius_m: f64 },
    NotAuthorized,
    MissingCoordinates,
}

impl CheckInDenial {
    pub fn reason(&self) -> String {
        match self {
            CheckInDenial::EventNotApproved => "Event is not approved".to_string(),
            CheckInDenial::NotStarted { starts_at } => {
                format!("Event starts at {}", starts_at.format("%H:%M"))
            }
            CheckInDenial::Ended { ended_at } => {
                format!("Event ended at {}", ended_at.format("%H:%M"))
            }
            CheckInDenial::AlreadyCheckedIn => "Already checked in".to_string(),
            CheckInDenial::OutOfRadius {
                distance_m,
                radius_m,
            } => format!(
                "Out of range: {:.0}m away, allowed radius is {:.0}m",
                distance_m, radius_m
            ),
            CheckInDenial::NotAuthorized => {
                "Not authorized to check in to this event".to_string()
            }
            CheckInDenial::MissingCoordinates => "Location coordinates required".to_string(),
        }
    }
}

/// What the caller's stored relationships say about this check-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckInContext {
    pub already_checked_in: bool,
    pub has_going_rsvp: bool,
    pub is_registered_guest: bool,
}

impl CheckInContext {
    fn authorized(&self) -> bool {
        self.has_going_rsvp || self.is_registered_guest
    }
}

/// Runs the five gates and returns the geofence distance on success.
/// Denial priority: approval, not-started, ended, duplicate, radius,
/// authorization, missing coordinates.
pub fn evaluate(
    event: &Event,
    now: DateTime<Utc>,
    coords: Option<(f64, f64)>,
    ctx: &CheckInContext,
) -> Result<f64, CheckInDenial> {
    if !event.is_approved() {
        return Err(CheckInDenial::EventNotApproved);
    }
    if now < event.start_time {
        return Err(CheckInDenial::NotStarted {
            starts_at: event.start_time,
        });
    }
    if now > event.end_time {
        return Err(CheckInDenial::Ended {
            ended_at: event.end_time,
        });
    }
    if ctx.already_checked_in {
        return Err(CheckInDenial::AlreadyCheckedIn);
    }

    let distance = coords
        .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
        .map(|(lat, lon)| geo::haversine_distance_m(lat, lon, event.latitude, event.longitude))
        .filter(|d| d.is_finite());

    if let Some(d) = distance {
        if d > event.radius_m {
            return Err(CheckInDenial::OutOfRadius {
                distance_m: d,
                radius_m: event.radius_m,
            });
        }
    }
    if !ctx.authorized() {
        return Err(CheckInDenial::NotAuthorized);
    }

    distance.ok_or(CheckInDenial::MissingCoordinates)
}

/// Read-only snapshot of every gate, for UI polling.
#[derive(Debug, Serialize)]
pub struct CheckInStatusView {
    pub can_check_in: bool,
    pub reason: Option<String>,
    pub checked_in: bool,
    pub event_approved: bool,
    pub started: bool,
    pub ended: bool,
    pub distance_m: Option<f64>,
    pub within_radius: Option<bool>,
    pub authorized: bool,
}

pub fn status_view(
    event: &Event,
    now: DateTime<Utc>,
    coords: Option<(f64, f64)>,
    ctx: &CheckInContext,
) -> CheckInStatusView {
    let distance = coords
        .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
        .map(|(lat, lon)| geo::haversine_distance_m(lat, lon, event.latitude, event.longitude))
        .filter(|d| d.is_finite());

    let outcome = evaluate(event, now, coords, ctx);

    CheckInStatusView {
        can_check_in: outcome.is_ok(),
        reason: outcome.err().map(|d| d.reason()),
        checked_in: ctx.already_checked_in,
        event_approved: event.is_approved(),
        started: now >= event.start_time,
        ended: now > event.end_time,
        distance_m: distance,
        within_radius: distance.map(|d| d <= event.radius_m),
        authorized: ctx.authorized(),
    }
}

/// Loads the caller's check-in context from the store.
pub async fn load_context(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<CheckInContext, AppError> {
    let already_checked_in = store::attendance::find(pool, event_id, user_id)
        .await?
        .is_some();
    let has_going_rsvp = store::engagement::find_rsvp(pool, event_id, user_id)
        .await?
        .map(|r| r.status == RsvpStatus::Going)
        .unwrap_or(false);
    let is_registered_guest = store::engagement::find_guest_for_user(pool, event_id, user_id)
        .await?
        .is_some();

    Ok(CheckInContext {
        already_checked_in,
        has_going_rsvp,
        is_registered_guest,
    })
}

/// The mutating check-in. The pre-check gives precise reasons; the unique
/// constraint on (event_id, user_id) settles concurrent attempts, with the
/// loser mapped to a conflict.
pub async fn check_in(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    coords: Option<(f64, f64)>,
) -> Result<EventAttendance, AppError> {
    let (event, _) = entitlement::visible_event(pool, event_id, caller).await?;
    let ctx = load_context(pool, event.id, caller.id).await?;

    let distance = match evaluate(&event, Utc::now(), coords, &ctx) {
        Ok(distance) => distance,
        Err(CheckInDenial::AlreadyCheckedIn) => {
            return Err(AppError::Conflict(CheckInDenial::AlreadyCheckedIn.reason()))
        }
        Err(CheckInDenial::NotAuthorized) => {
            return Err(AppError::Forbidden(CheckInDenial::NotAuthorized.reason()))
        }
        Err(CheckInDenial::MissingCoordinates) => {
            return Err(AppError::ValidationError(
                CheckInDenial::MissingCoordinates.reason(),
            ))
        }
        Err(denial) => return Err(AppError::Forbidden(denial.reason())),
    };

    let (lat, lon) = coords.unwrap_or_default();
    store::attendance::insert(pool, event.id, caller.id, lat, lon, distance)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Already checked in"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::TimeZone;

    fn event_at_origin(radius_m: f64) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            title: "Launch".to_string(),
            description: None,
            approval_status: ApprovalStatus::Approved,
            is_public: true,
            max_attendees: None,
            start_time: start,
            end_time: end,
            latitude: 0.0,
            longitude: 0.0,
            radius_m,
            badge_image: None,
            created_at: start,
            updated_at: start,
        }
    }

    fn authorized() -> CheckInContext {
        CheckInContext {
            already_checked_in: false,
            has_going_rsvp: true,
            is_registered_guest: false,
        }
    }

    fn during(event: &Event) -> DateTime<Utc> {
        event.start_time + chrono::Duration::minutes(30)
    }

    #[test]
    fn check_in_at_event_center_succeeds_with_zero_distance() {
        let event = event_at_origin(100.0);
        let d = evaluate(&event, during(&event), Some((0.0, 0.0)), &authorized()).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn check_in_before_start_reports_start_time() {
        let event = event_at_origin(100.0);
        let just_before = event.start_time - chrono::Duration::minutes(1);
        let denial = evaluate(&event, just_before, Some((0.0, 0.0)), &authorized()).unwrap_err();
        assert_eq!(denial.reason(), "Event starts at 10:00");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let event = event_at_origin(100.0);
        let ctx = authorized();
        assert!(evaluate(&event, event.start_time, Some((0.0, 0.0)), &ctx).is_ok());
        assert!(evaluate(&event, event.end_time, Some((0.0, 0.0)), &ctx).is_ok());
        assert!(matches!(
            evaluate(
                &event,
                event.end_time + chrono::Duration::seconds(1),
                Some((0.0, 0.0)),
                &ctx
            ),
            Err(CheckInDenial::Ended { .. })
        ));
    }

    #[test]
    fn distance_exactly_at_radius_is_allowed() {
        // Radius chosen as the exact haversine distance to the test point.
        let point = (0.0009, 0.0);
        let radius = geo::haversine_distance_m(point.0, point.1, 0.0, 0.0);
        let event = event_at_origin(radius);
        assert!(evaluate(&event, during(&event), Some(point), &authorized()).is_ok());

        let tighter = event_at_origin(radius - 0.001);
        assert!(matches!(
            evaluate(&tighter, during(&tighter), Some(point), &authorized()),
            Err(CheckInDenial::OutOfRadius { .. })
        ));
    }

    #[test]
    fn unapproved_event_wins_over_every_other_denial() {
        let mut event = event_at_origin(100.0);
        event.approval_status = ApprovalStatus::Pending;
        // Everything else is wrong too, but approval is reported first.
        let ctx = CheckInContext {
            already_checked_in: true,
            has_going_rsvp: false,
            is_registered_guest: false,
        };
        let before = event.start_time - chrono::Duration::hours(1);
        assert_eq!(
            evaluate(&event, before, None, &ctx),
            Err(CheckInDenial::EventNotApproved)
        );
    }

    #[test]
    fn duplicate_check_in_reported_before_radius_and_authorization() {
        let event = event_at_origin(100.0);
        let ctx = CheckInContext {
            already_checked_in: true,
            has_going_rsvp: false,
            is_registered_guest: false,
        };
        assert_eq!(
            evaluate(&event, during(&event), Some((10.0, 10.0)), &ctx),
            Err(CheckInDenial::AlreadyCheckedIn)
        );
    }

    #[test]
    fn out_of_radius_reported_before_not_authorized() {
        let event = event_at_origin(100.0);
        let ctx = CheckInContext::default();
        assert!(matches!(
            evaluate(&event, during(&event), Some((10.0, 10.0)), &ctx),
            Err(CheckInDenial::OutOfRadius { .. })
        ));
    }

    #[test]
    fn not_authorized_reported_before_missing_coordinates() {
        let event = event_at_origin(100.0);
        let ctx = CheckInContext::default();
        assert_eq!(
            evaluate(&event, during(&event), None, &ctx),
            Err(CheckInDenial::NotAuthorized)
        );
    }

    #[test]
    fn missing_coordinates_is_the_final_gate() {
        let event = event_at_origin(100.0);
        assert_eq!(
            evaluate(&event, during(&event), None, &authorized()),
            Err(CheckInDenial::MissingCoordinates)
        );
        // Non-finite coordinates are treated as missing, not as in-range.
        assert_eq!(
            evaluate(&event, during(&event), Some((f64::NAN, 0.0)), &authorized()),
            Err(CheckInDenial::MissingCoordinates)
        );
    }

    #[test]
    fn registered_guest_is_authorized_without_rsvp() {
        let event = event_at_origin(100.0);
        let ctx = CheckInContext {
            already_checked_in: false,
            has_going_rsvp: false,
            is_registered_guest: true,
        };
        assert!(evaluate(&event, during(&event), Some((0.0, 0.0)), &ctx).is_ok());
    }

    #[test]
    fn status_view_reports_gates_individually() {
        let event = event_at_origin(100.0);
        let view = status_view(&event, during(&event), Some((10.0, 10.0)), &authorized());
        assert!(!view.can_check_in);
        assert!(view.event_approved);
        assert!(view.started);
        assert!(!view.ended);
        assert_eq!(view.within_radius, Some(false));
        assert!(view.authorized);
        assert!(view.reason.unwrap().starts_with("Out of range"));
    }
}
