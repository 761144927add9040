pub mod checkin;
pub mod engagement;
pub mod entitlement;
pub mod minting;
