use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, health_check};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/events",
            post(handlers::events::create_event).get(handlers::events::list_events),
        )
        .route(
            "/events/:id",
            get(handlers::events::get_event).patch(handlers::events::update_event),
        )
        .route("/events/:id/approval", post(handlers::events::set_approval))
        .route(
            "/events/:id/entitlement",
            get(handlers::events::get_entitlement),
        )
        .route("/events/:id/rsvp", put(handlers::engagement::set_rsvp))
        .route(
            "/events/:id/join-requests",
            post(handlers::engagement::create_join_request),
        )
        .route(
            "/events/:id/join-requests/respond",
            post(handlers::engagement::respond_join_request),
        )
        .route(
            "/events/:id/join-requests/respond-batch",
            post(handlers::engagement::batch_respond_join_requests),
        )
        .route(
            "/events/:id/invites",
            post(handlers::engagement::create_invite),
        )
        .route(
            "/events/:id/invites/batch",
            post(handlers::engagement::batch_create_invites),
        )
        .route(
            "/events/:id/invites/respond",
            post(handlers::engagement::respond_invite),
        )
        .route(
            "/events/:id/check-in/status",
            get(handlers::checkin::check_in_status),
        )
        .route("/events/:id/check-in", post(handlers::checkin::check_in))
        .route(
            "/events/:id/attendance",
            get(handlers::checkin::list_attendance),
        )
        .route(
            "/events/:id/minting-approval",
            post(handlers::minting::set_minting_approval),
        )
        .route(
            "/events/:id/badges/claim",
            post(handlers::minting::claim_badge),
        )
        .route(
            "/events/:id/badges/batch-mint",
            post(handlers::minting::batch_mint),
        )
        .route("/metadata/:id", get(handlers::metadata::get_metadata))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
