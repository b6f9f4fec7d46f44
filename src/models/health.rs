use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use schemars::JsonSchema;

#[derive(Serialize, Debug, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Sessions held by the feed right now.
    pub sessions: usize,
    /// `None` until the first successful load.
    pub refreshed_at: Option<DateTime<Utc>>,
}
