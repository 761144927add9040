pub mod attendance;
pub mod badge;
pub mod engagement;
pub mod event;
pub mod user;

pub use attendance::EventAttendance;
pub use badge::{Badge, BadgeType, NftMetadata};
pub use engagement::{
    EventGuest, EventInvite, EventJoinRequest, EventRsvp, InviteStatus, JoinRequestStatus,
    RsvpStatus,
};
pub use event::{ApprovalStatus, Event};
pub use user::{Role, User};
