use crate::auth::CurrentMember;
use crate::error::app_error::AppError;
use crate::models::session::{BadgeResponse, BadgeSessionResponse, RefreshResponse, SessionResponse};
use crate::service::directory::Directory;
use crate::service::feed::{RefreshOutcome, SessionFeed};
use crate::service::schedule::{LivenessPolicy, ScheduleEntry, live_sessions, select_badge, upcoming_sessions};
use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use std::sync::Arc;

fn to_responses<'a>(
    entries: impl Iterator<Item = &'a ScheduleEntry>,
    policy: &LivenessPolicy,
    directory: &Directory,
    now: DateTime<Utc>,
) -> Vec<SessionResponse> {
    entries.map(|entry| SessionResponse::from_entry(entry, policy, directory, now)).collect()
}

pub(crate) fn badge_response(entries: &[ScheduleEntry], policy: &LivenessPolicy, now: DateTime<Utc>) -> BadgeResponse {
    let selection = select_badge(entries, policy, now);
    let kind = selection.kind();
    BadgeResponse {
        kind,
        color: kind.color(),
        session: selection.entry().map(|entry| BadgeSessionResponse::from(&entry.session)),
    }
}

/// All sessions in chronological order
///
/// Each entry says whether it is live right now. Rows with an unreadable date
/// or time come last and are never live.
#[openapi(tag = "Sessions")]
#[get("/")]
pub async fn list_sessions(feed: &State<Arc<SessionFeed>>, directory: &State<Arc<Directory>>, _current_member: CurrentMember) -> Json<Vec<SessionResponse>> {
    let snapshot = feed.snapshot();
    Json(to_responses(snapshot.entries.iter(), feed.policy(), directory, Utc::now()))
}

/// Sessions whose join window is open
#[openapi(tag = "Sessions")]
#[get("/live")]
pub async fn list_live_sessions(
    feed: &State<Arc<SessionFeed>>,
    directory: &State<Arc<Directory>>,
    _current_member: CurrentMember,
) -> Json<Vec<SessionResponse>> {
    let snapshot = feed.snapshot();
    let policy = feed.policy();
    let now = Utc::now();
    Json(to_responses(live_sessions(&snapshot.entries, policy, now), policy, directory, now))
}

/// Future sessions that are not live yet
#[openapi(tag = "Sessions")]
#[get("/upcoming")]
pub async fn list_upcoming_sessions(
    feed: &State<Arc<SessionFeed>>,
    directory: &State<Arc<Directory>>,
    _current_member: CurrentMember,
) -> Json<Vec<SessionResponse>> {
    let snapshot = feed.snapshot();
    let policy = feed.policy();
    let now = Utc::now();
    Json(to_responses(upcoming_sessions(&snapshot.entries, policy, now), policy, directory, now))
}

/// The single session the header badge should show
///
/// A live session wins over an upcoming one; `kind` is `none` when nothing
/// is live or ahead.
#[openapi(tag = "Sessions")]
#[get("/badge")]
pub async fn get_badge(feed: &State<Arc<SessionFeed>>, _current_member: CurrentMember) -> Json<BadgeResponse> {
    let snapshot = feed.snapshot();
    Json(badge_response(&snapshot.entries, feed.policy(), Utc::now()))
}

/// Reload the session list now
#[openapi(tag = "Sessions")]
#[post("/refresh")]
pub async fn post_refresh(feed: &State<Arc<SessionFeed>>, _current_member: CurrentMember) -> Result<Json<RefreshResponse>, AppError> {
    let applied = match feed.refresh().await? {
        RefreshOutcome::Applied { .. } => true,
        RefreshOutcome::Superseded => false,
        RefreshOutcome::Closed => return Err(AppError::Unavailable("The portal is shutting down".to_string())),
    };

    let snapshot = feed.snapshot();
    Ok(Json(RefreshResponse {
        applied,
        sessions: snapshot.entries.len(),
        refreshed_at: snapshot.refreshed_at,
    }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_sessions, list_live_sessions, list_upcoming_sessions, get_badge, post_refresh]
}
