use crate::models::health::HealthResponse;
use crate::service::feed::SessionFeed;
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;
use std::sync::Arc;

/// Liveness probe
///
/// Also reports how many sessions the feed holds and when it last loaded.
#[openapi(tag = "Health")]
#[get("/")]
pub async fn healthcheck(feed: &State<Arc<SessionFeed>>) -> Json<HealthResponse> {
    let snapshot = feed.snapshot();
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: snapshot.entries.len(),
        refreshed_at: snapshot.refreshed_at,
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![healthcheck]
}
