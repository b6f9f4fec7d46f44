use crate::service::directory::Directory;
use crate::service::schedule::{LivenessPolicy, ScheduleEntry, format_badge_date, format_badge_time, pad_session_time, weekday_label};
use chrono::{DateTime, FixedOffset, Utc};
use rocket::serde::Serialize;
use schemars::JsonSchema;

/// A row of the `sessions` table.
///
/// `sessiondate` and `sessiontime` stay as the raw text the table holds so that
/// one malformed row cannot fail the whole read; the instant they describe is
/// derived by [`LivenessPolicy::start_of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ScheduledSession {
    pub sessionid: i32,
    pub sessiontitle: String,
    pub sessiondate: String,
    pub sessiontime: String,
    pub sessionlink: String,
    /// Trainer e-mail.
    pub name_of_the_trainer: Option<String>,
    pub day: Option<String>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionResponse {
    pub sessionid: i32,
    pub sessiontitle: String,
    pub sessiondate: String,
    /// Always `HH:MM:SS`.
    pub sessiontime: String,
    pub day: String,
    pub trainer: String,
    pub sessionlink: String,
    /// Start instant in the institute zone; absent when the row cannot be parsed.
    pub starts_at: Option<DateTime<FixedOffset>>,
    pub live: bool,
}

impl SessionResponse {
    pub fn from_entry(entry: &ScheduleEntry, policy: &LivenessPolicy, directory: &Directory, now: DateTime<Utc>) -> Self {
        let session = &entry.session;
        Self {
            sessionid: session.sessionid,
            sessiontitle: session.sessiontitle.clone(),
            sessiondate: session.sessiondate.clone(),
            sessiontime: pad_session_time(&session.sessiontime),
            day: weekday_label(session),
            trainer: directory.trainer_name(session.name_of_the_trainer.as_deref()),
            sessionlink: session.sessionlink.clone(),
            starts_at: entry.start.map(|start| start.fixed_offset()),
            live: entry.is_live(policy, now),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    None,
    Live,
    Upcoming,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Red,
}

impl BadgeKind {
    pub fn color(self) -> Option<BadgeColor> {
        match self {
            BadgeKind::None => None,
            BadgeKind::Live => Some(BadgeColor::Green),
            BadgeKind::Upcoming => Some(BadgeColor::Red),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct BadgeSessionResponse {
    pub sessionid: i32,
    pub title: String,
    /// e.g. `10 Jan 2025`
    pub date: String,
    /// e.g. `09:00 AM`
    pub time: String,
    pub link: String,
}

impl From<&ScheduledSession> for BadgeSessionResponse {
    fn from(session: &ScheduledSession) -> Self {
        Self {
            sessionid: session.sessionid,
            title: session.sessiontitle.clone(),
            date: format_badge_date(&session.sessiondate),
            time: format_badge_time(&session.sessiontime),
            link: session.sessionlink.clone(),
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct BadgeResponse {
    pub kind: BadgeKind,
    pub color: Option<BadgeColor>,
    pub session: Option<BadgeSessionResponse>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct RefreshResponse {
    /// False when a newer refresh finished first and this result was dropped.
    pub applied: bool,
    pub sessions: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}
