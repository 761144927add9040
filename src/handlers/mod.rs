use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

pub mod checkin;
pub mod engagement;
pub mod events;
pub mod metadata;
pub mod minting;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "proofpass-api",
    };

    success(payload, "Health check successful").into_response()
}
