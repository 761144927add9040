//! All SQL lives here. Handlers and services call these helpers; the
//! unique constraints in `migrations/` back the conflict semantics.

pub mod attendance;
pub mod badges;
pub mod engagement;
pub mod events;
pub mod metadata;
pub mod users;
