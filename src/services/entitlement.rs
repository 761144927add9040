//! Decides what a user may do with an event: see it, manage it, RSVP to
//! it. Visibility of private or unapproved events is never leaked; an
//! invisible event and a missing event are both reported as not found.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Event, InviteStatus, JoinRequestStatus, User};
use crate::store;
use crate::utils::error::AppError;

/// Snapshot of the caller's relationship records for one event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relations {
    pub invite: Option<InviteStatus>,
    pub join_request: Option<JoinRequestStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRelation {
    Creator,
    Admin,
    InviteAccepted,
    RequestApproved,
    None,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Entitlement {
    pub can_view: bool,
    pub can_manage: bool,
    pub can_rsvp: bool,
    pub relation: EventRelation,
}

/// Pure resolution over an event and a relations snapshot.
pub fn resolve(event: &Event, viewer: &User, relations: &Relations) -> Entitlement {
    let is_creator = viewer.id == event.created_by;
    let can_manage = viewer.is_admin() || is_creator;

    let invite_accepted = relations.invite == Some(InviteStatus::Accepted);
    let request_approved = relations.join_request == Some(JoinRequestStatus::Approved);

    // Managers see everything regardless of approval status. Everyone
    // else needs an approved event, plus an accepted invite when private.
    let can_view = can_manage
        || (event.is_approved() && (event.is_public || invite_accepted));

    let can_rsvp = can_manage
        || (can_view
            && if event.is_public {
                request_approved
            } else {
                invite_accepted
            });

    let relation = if is_creator {
        EventRelation::Creator
    } else if viewer.is_admin() {
        EventRelation::Admin
    } else if invite_accepted {
        EventRelation::InviteAccepted
    } else if request_approved {
        EventRelation::RequestApproved
    } else {
        EventRelation::None
    };

    Entitlement {
        can_view,
        can_manage,
        can_rsvp,
        relation,
    }
}

/// Fetches the relations snapshot and resolves.
pub async fn load(pool: &PgPool, event: &Event, viewer: &User) -> Result<Entitlement, AppError> {
    let relations = Relations {
        invite: store::engagement::find_invite(pool, event.id, viewer.id)
            .await?
            .map(|i| i.status),
        join_request: store::engagement::find_join_request(pool, event.id, viewer.id)
            .await?
            .map(|r| r.status),
    };
    Ok(resolve(event, viewer, &relations))
}

/// Loads an event and fails with `NotFound` both when it does not exist
/// and when the caller may not see it.
pub async fn visible_event(
    pool: &PgPool,
    event_id: Uuid,
    viewer: &User,
) -> Result<(Event, Entitlement), AppError> {
    let event = store::events::find(pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let entitlement = load(pool, &event, viewer).await?;
    if !entitlement.can_view {
        return Err(AppError::NotFound("Event not found".to_string()));
    }
    Ok((event, entitlement))
}

pub fn require_manage(entitlement: &Entitlement) -> Result<(), AppError> {
    if entitlement.can_manage {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the event owner or an admin may do this".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Role};
    use chrono::{Duration, Utc};

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            wallet_address: None,
            role,
            api_token: "tok".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event(created_by: Uuid, status: ApprovalStatus, is_public: bool) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            created_by,
            title: "Meetup".to_string(),
            description: None,
            approval_status: status,
            is_public,
            max_attendees: None,
            start_time: now,
            end_time: now + Duration::hours(2),
            latitude: 0.0,
            longitude: 0.0,
            radius_m: 100.0,
            badge_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn creator_manages_and_sees_unapproved_event() {
        let creator = user(Role::User);
        let ev = event(creator.id, ApprovalStatus::Pending, true);
        let ent = resolve(&ev, &creator, &Relations::default());
        assert!(ent.can_view);
        assert!(ent.can_manage);
        assert!(ent.can_rsvp);
        assert_eq!(ent.relation, EventRelation::Creator);
    }

    #[test]
    fn admin_manages_any_event() {
        let admin = user(Role::Admin);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Rejected, false);
        let ent = resolve(&ev, &admin, &Relations::default());
        assert!(ent.can_view);
        assert!(ent.can_manage);
        assert_eq!(ent.relation, EventRelation::Admin);
    }

    #[test]
    fn unapproved_event_is_invisible_to_others() {
        let viewer = user(Role::User);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Pending, true);
        let ent = resolve(&ev, &viewer, &Relations::default());
        assert!(!ent.can_view);
        assert!(!ent.can_rsvp);
    }

    #[test]
    fn approved_public_event_is_visible_but_rsvp_needs_approved_request() {
        let viewer = user(Role::User);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Approved, true);

        let ent = resolve(&ev, &viewer, &Relations::default());
        assert!(ent.can_view);
        assert!(!ent.can_rsvp);

        let relations = Relations {
            join_request: Some(JoinRequestStatus::Approved),
            ..Default::default()
        };
        let ent = resolve(&ev, &viewer, &relations);
        assert!(ent.can_rsvp);
        assert_eq!(ent.relation, EventRelation::RequestApproved);
    }

    #[test]
    fn pending_request_does_not_grant_rsvp() {
        let viewer = user(Role::User);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Approved, true);
        let relations = Relations {
            join_request: Some(JoinRequestStatus::Pending),
            ..Default::default()
        };
        assert!(!resolve(&ev, &viewer, &relations).can_rsvp);
    }

    #[test]
    fn private_event_needs_accepted_invite_for_view_and_rsvp() {
        let viewer = user(Role::User);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Approved, false);

        let ent = resolve(&ev, &viewer, &Relations::default());
        assert!(!ent.can_view);

        let pending = Relations {
            invite: Some(InviteStatus::Pending),
            ..Default::default()
        };
        assert!(!resolve(&ev, &viewer, &pending).can_view);

        let accepted = Relations {
            invite: Some(InviteStatus::Accepted),
            ..Default::default()
        };
        let ent = resolve(&ev, &viewer, &accepted);
        assert!(ent.can_view);
        assert!(ent.can_rsvp);
        assert_eq!(ent.relation, EventRelation::InviteAccepted);
    }

    #[test]
    fn approved_request_on_private_event_grants_nothing() {
        // Join requests only apply to public events; an approved one must
        // not open a private event.
        let viewer = user(Role::User);
        let ev = event(Uuid::new_v4(), ApprovalStatus::Approved, false);
        let relations = Relations {
            join_request: Some(JoinRequestStatus::Approved),
            ..Default::default()
        };
        let ent = resolve(&ev, &viewer, &relations);
        assert!(!ent.can_view);
        assert!(!ent.can_rsvp);
    }
}
