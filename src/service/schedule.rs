//! Liveness and badge selection for scheduled sessions.
//!
//! A session is live from `early_join` before its start until `live_duration`
//! after it: the window is half-open, `[start - early_join, start + live_duration)`.
//! Start instants are always built in the institute's zone.

use crate::config::SessionsConfig;
use crate::error::app_error::AppError;
use crate::models::session::{BadgeKind, ScheduledSession};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    pub timezone: Tz,
    pub early_join: TimeDelta,
    pub live_duration: TimeDelta,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            early_join: TimeDelta::minutes(5),
            live_duration: TimeDelta::minutes(60),
        }
    }
}

impl LivenessPolicy {
    #[allow(clippy::result_large_err)]
    pub fn from_config(config: &SessionsConfig) -> Result<Self, AppError> {
        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|_| AppError::InvalidSetting(format!("unknown timezone '{}'", config.timezone)))?;

        if config.early_join_minutes < 0 || config.live_duration_minutes <= 0 {
            return Err(AppError::InvalidSetting(format!(
                "session window must be non-negative (early join {} min, duration {} min)",
                config.early_join_minutes, config.live_duration_minutes
            )));
        }

        Ok(Self {
            timezone,
            early_join: TimeDelta::minutes(config.early_join_minutes),
            live_duration: TimeDelta::minutes(config.live_duration_minutes),
        })
    }

    /// The instant a session starts, or `None` if its date or time cannot be
    /// read or names a wall-clock time that does not exist in the zone.
    pub fn start_of(&self, session: &ScheduledSession) -> Option<DateTime<Tz>> {
        let date = parse_session_date(&session.sessiondate)?;
        let time = parse_session_time(&session.sessiontime)?;
        self.timezone.from_local_datetime(&date.and_time(time)).earliest()
    }

    pub fn window_contains(&self, start: DateTime<Tz>, now: DateTime<Utc>) -> bool {
        let now = now.with_timezone(&self.timezone);
        start - self.early_join <= now && now < start + self.live_duration
    }

    pub fn is_live(&self, session: &ScheduledSession, now: DateTime<Utc>) -> bool {
        self.start_of(session).is_some_and(|start| self.window_contains(start, now))
    }
}

pub fn parse_session_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn parse_session_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS.iter().find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

/// A session together with its start instant, computed once per refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub session: ScheduledSession,
    pub start: Option<DateTime<Tz>>,
}

impl ScheduleEntry {
    pub fn new(session: ScheduledSession, policy: &LivenessPolicy) -> Self {
        let start = policy.start_of(&session);
        Self { session, start }
    }

    pub fn is_live(&self, policy: &LivenessPolicy, now: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| policy.window_contains(start, now))
    }

    pub fn starts_after(&self, now: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| start > now)
    }
}

/// Stable ascending sort by start instant; rows without a start go last in
/// their original order.
pub fn sort_chronologically(entries: &mut [ScheduleEntry]) {
    entries.sort_by_key(|entry| (entry.start.is_none(), entry.start));
}

pub fn build_schedule(sessions: Vec<ScheduledSession>, policy: &LivenessPolicy) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = sessions.into_iter().map(|session| ScheduleEntry::new(session, policy)).collect();
    sort_chronologically(&mut entries);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BadgeSelection<'a> {
    None,
    Live(&'a ScheduleEntry),
    Upcoming(&'a ScheduleEntry),
}

impl<'a> BadgeSelection<'a> {
    pub fn kind(&self) -> BadgeKind {
        match self {
            BadgeSelection::None => BadgeKind::None,
            BadgeSelection::Live(_) => BadgeKind::Live,
            BadgeSelection::Upcoming(_) => BadgeKind::Upcoming,
        }
    }

    pub fn entry(&self) -> Option<&'a ScheduleEntry> {
        match *self {
            BadgeSelection::None => None,
            BadgeSelection::Live(entry) | BadgeSelection::Upcoming(entry) => Some(entry),
        }
    }
}

/// Picks the session to surface. `entries` must already be in chronological
/// order: the earliest live session wins, then the nearest future one.
pub fn select_badge<'a>(entries: &'a [ScheduleEntry], policy: &LivenessPolicy, now: DateTime<Utc>) -> BadgeSelection<'a> {
    if let Some(live) = entries.iter().find(|entry| entry.is_live(policy, now)) {
        return BadgeSelection::Live(live);
    }

    entries
        .iter()
        .find(|entry| entry.starts_after(now))
        .map_or(BadgeSelection::None, BadgeSelection::Upcoming)
}

pub fn live_sessions<'a>(entries: &'a [ScheduleEntry], policy: &'a LivenessPolicy, now: DateTime<Utc>) -> impl Iterator<Item = &'a ScheduleEntry> {
    entries.iter().filter(move |entry| entry.is_live(policy, now))
}

/// Future sessions that have not opened their join window yet.
pub fn upcoming_sessions<'a>(entries: &'a [ScheduleEntry], policy: &'a LivenessPolicy, now: DateTime<Utc>) -> impl Iterator<Item = &'a ScheduleEntry> {
    entries
        .iter()
        .filter(move |entry| entry.starts_after(now) && !entry.is_live(policy, now))
}

// ── Presentation ──────────────────────────────────────────────────────────────

/// Pads each `:`-separated part to two digits and appends seconds when missing.
pub fn pad_session_time(raw: &str) -> String {
    let mut parts: Vec<String> = raw.trim().split(':').map(|part| format!("{:0>2}", part)).collect();
    if parts.len() == 2 {
        parts.push("00".to_string());
    }
    parts.join(":")
}

pub fn weekday_label(session: &ScheduledSession) -> String {
    match parse_session_date(&session.sessiondate) {
        Some(date) => date.format("%A").to_string(),
        None => session.day.clone().unwrap_or_else(|| "Unknown Day".to_string()),
    }
}

pub fn format_badge_date(raw: &str) -> String {
    parse_session_date(raw).map_or_else(|| raw.to_string(), |date| date.format("%d %b %Y").to_string())
}

pub fn format_badge_time(raw: &str) -> String {
    parse_session_time(raw).map_or_else(|| raw.to_string(), |time| time.format("%I:%M %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use proptest::prelude::*;

    fn session(id: i32, date: &str, time: &str) -> ScheduledSession {
        ScheduledSession {
            sessionid: id,
            sessiontitle: format!("Session {id}"),
            sessiondate: date.to_string(),
            sessiontime: time.to_string(),
            sessionlink: format!("https://meet.google.com/session-{id}"),
            name_of_the_trainer: None,
            day: None,
        }
    }

    fn ist(raw: &str) -> DateTime<Utc> {
        DateTime::<FixedOffset>::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn start_is_built_in_institute_zone() {
        let policy = LivenessPolicy::default();
        let start = policy.start_of(&session(1, "2025-01-10", "09:00:00")).unwrap();
        assert_eq!(start.with_timezone(&Utc), ist("2025-01-10T03:30:00Z"));
    }

    #[test]
    fn short_and_fractional_times_are_accepted() {
        let policy = LivenessPolicy::default();
        let expected = policy.start_of(&session(1, "2025-01-10", "09:00:00"));
        assert_eq!(policy.start_of(&session(1, "2025-01-10", "09:00")), expected);
        assert_eq!(policy.start_of(&session(1, "2025-01-10", "09:00:00.000")), expected);
        assert_eq!(policy.start_of(&session(1, " 2025-01-10 ", " 09:00 ")), expected);
    }

    #[test]
    fn live_four_minutes_before_start() {
        let policy = LivenessPolicy::default();
        let s = session(1, "2025-01-10", "09:00:00");
        assert!(policy.is_live(&s, ist("2025-01-10T08:56:00+05:30")));
    }

    #[test]
    fn not_live_sixty_one_minutes_after_start() {
        let policy = LivenessPolicy::default();
        let s = session(1, "2025-01-10", "09:00:00");
        assert!(!policy.is_live(&s, ist("2025-01-10T10:01:00+05:30")));
    }

    #[test]
    fn window_boundaries() {
        let policy = LivenessPolicy::default();
        let s = session(1, "2025-01-10", "09:00:00");
        let start = policy.start_of(&s).unwrap().with_timezone(&Utc);

        assert!(policy.is_live(&s, start - TimeDelta::minutes(5)));
        assert!(!policy.is_live(&s, start - TimeDelta::minutes(5) - TimeDelta::milliseconds(1)));
        assert!(policy.is_live(&s, start + TimeDelta::minutes(60) - TimeDelta::milliseconds(1)));
        assert!(!policy.is_live(&s, start + TimeDelta::minutes(60)));
    }

    #[test]
    fn same_wall_clock_elsewhere_is_not_live() {
        // 09:00 in New York is 19:30 in Kolkata, long after the session ended.
        let policy = LivenessPolicy::default();
        let s = session(1, "2025-01-10", "09:00:00");
        assert!(!policy.is_live(&s, ist("2025-01-10T09:00:00-05:00")));
    }

    #[test]
    fn malformed_rows_are_never_live() {
        let policy = LivenessPolicy::default();
        let now = ist("2025-01-10T09:00:00+05:30");
        assert!(!policy.is_live(&session(1, "not-a-date", "09:00:00"), now));
        assert!(!policy.is_live(&session(2, "2025-01-10", "nine"), now));
        assert!(!policy.is_live(&session(3, "2025-02-30", "09:00"), now));
        assert!(!policy.is_live(&session(4, "2025-01-10", "25:00"), now));
    }

    #[test]
    fn nonexistent_local_time_is_excluded() {
        let policy = LivenessPolicy {
            timezone: chrono_tz::America::New_York,
            ..LivenessPolicy::default()
        };
        assert_eq!(policy.start_of(&session(1, "2025-03-09", "02:30")), None);
    }

    #[test]
    fn from_config_rejects_unknown_timezone() {
        let config = SessionsConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..SessionsConfig::default()
        };
        assert!(matches!(LivenessPolicy::from_config(&config), Err(AppError::InvalidSetting(_))));
    }

    #[test]
    fn from_config_defaults_match_default_policy() {
        let policy = LivenessPolicy::from_config(&SessionsConfig::default()).unwrap();
        assert_eq!(policy, LivenessPolicy::default());
    }

    #[test]
    fn schedule_is_sorted_with_malformed_rows_last() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(
            vec![
                session(1, "2025-01-12", "10:00"),
                session(2, "not-a-date", "09:00"),
                session(3, "2025-01-10", "16:00:00"),
                session(4, "2025-01-10", "09:00"),
                session(5, "2025-01-10", "bad"),
            ],
            &policy,
        );

        let ids: Vec<i32> = entries.iter().map(|entry| entry.session.sessionid).collect();
        assert_eq!(ids, vec![4, 3, 1, 2, 5]);
    }

    #[test]
    fn equal_starts_keep_input_order() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(
            vec![
                session(7, "2025-01-10", "09:00"),
                session(3, "2025-01-10", "09:00:00"),
                session(5, "2025-01-10", "09:00"),
            ],
            &policy,
        );

        let ids: Vec<i32> = entries.iter().map(|entry| entry.session.sessionid).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn live_session_wins_over_later_upcoming() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(
            vec![session(2, "2025-01-10", "15:00"), session(1, "2025-01-10", "09:00")],
            &policy,
        );

        let selection = select_badge(&entries, &policy, ist("2025-01-10T09:20:00+05:30"));
        assert_eq!(selection.kind(), BadgeKind::Live);
        assert_eq!(selection.entry().unwrap().session.sessionid, 1);
    }

    #[test]
    fn earliest_live_session_wins_when_several_overlap() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(
            vec![session(2, "2025-01-10", "09:30"), session(1, "2025-01-10", "09:00")],
            &policy,
        );

        let selection = select_badge(&entries, &policy, ist("2025-01-10T09:40:00+05:30"));
        assert_eq!(selection.kind(), BadgeKind::Live);
        assert_eq!(selection.entry().unwrap().session.sessionid, 1);
    }

    #[test]
    fn nearest_future_session_when_nothing_is_live() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(
            vec![
                session(1, "2025-01-09", "09:00"),
                session(2, "not-a-date", "09:00"),
                session(3, "2025-01-12", "09:00"),
                session(4, "2025-01-11", "09:00"),
            ],
            &policy,
        );

        let selection = select_badge(&entries, &policy, ist("2025-01-10T12:00:00+05:30"));
        assert_eq!(selection.kind(), BadgeKind::Upcoming);
        assert_eq!(selection.entry().unwrap().session.sessionid, 4);
    }

    #[test]
    fn empty_schedule_selects_nothing() {
        let policy = LivenessPolicy::default();
        let selection = select_badge(&[], &policy, Utc::now());
        assert_eq!(selection, BadgeSelection::None);
        assert_eq!(selection.kind(), BadgeKind::None);
        assert!(selection.entry().is_none());
    }

    #[test]
    fn only_past_and_malformed_sessions_select_nothing() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(vec![session(1, "2024-03-04", "14:30"), session(2, "not-a-date", "09:00")], &policy);
        assert_eq!(select_badge(&entries, &policy, ist("2025-01-10T12:00:00+05:30")), BadgeSelection::None);
    }

    #[test]
    fn clock_advance_alone_moves_a_session_through_its_states() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(vec![session(1, "2025-01-10", "09:00")], &policy);

        assert_eq!(select_badge(&entries, &policy, ist("2025-01-10T08:00:00+05:30")).kind(), BadgeKind::Upcoming);
        assert_eq!(select_badge(&entries, &policy, ist("2025-01-10T08:58:00+05:30")).kind(), BadgeKind::Live);
        assert_eq!(select_badge(&entries, &policy, ist("2025-01-10T10:00:00+05:30")).kind(), BadgeKind::None);
    }

    #[test]
    fn upcoming_excludes_sessions_inside_join_window() {
        let policy = LivenessPolicy::default();
        let entries = build_schedule(vec![session(1, "2025-01-10", "09:00"), session(2, "2025-01-10", "11:00")], &policy);
        let now = ist("2025-01-10T08:57:00+05:30");

        let live: Vec<i32> = live_sessions(&entries, &policy, now).map(|e| e.session.sessionid).collect();
        let upcoming: Vec<i32> = upcoming_sessions(&entries, &policy, now).map(|e| e.session.sessionid).collect();
        assert_eq!(live, vec![1]);
        assert_eq!(upcoming, vec![2]);
    }

    #[test]
    fn pad_session_time_matches_display_format() {
        assert_eq!(pad_session_time("9:5"), "09:05:00");
        assert_eq!(pad_session_time("14:30"), "14:30:00");
        assert_eq!(pad_session_time("14:30:00"), "14:30:00");
    }

    #[test]
    fn weekday_label_falls_back_to_stored_day() {
        let mut s = session(1, "2025-01-10", "09:00");
        assert_eq!(weekday_label(&s), "Friday");

        s.sessiondate = "TBD".to_string();
        assert_eq!(weekday_label(&s), "Unknown Day");

        s.day = Some("Monday".to_string());
        assert_eq!(weekday_label(&s), "Monday");
    }

    #[test]
    fn badge_formatting_keeps_unparseable_text() {
        assert_eq!(format_badge_date("2025-03-04"), "04 Mar 2025");
        assert_eq!(format_badge_date("soon"), "soon");
        assert_eq!(format_badge_time("09:00"), "09:00 AM");
        assert_eq!(format_badge_time("later"), "later");
    }

    proptest! {
        #[test]
        fn is_live_matches_window_definition(offset_secs in -7_200i64..7_200) {
            let policy = LivenessPolicy::default();
            let s = session(1, "2025-01-10", "09:00:00");
            let start = policy.start_of(&s).unwrap().with_timezone(&Utc);
            let now = start + TimeDelta::seconds(offset_secs);

            let expected = start - TimeDelta::minutes(5) <= now && now < start + TimeDelta::minutes(60);
            prop_assert_eq!(policy.is_live(&s, now), expected);
        }

        #[test]
        fn sorting_is_idempotent(slots in proptest::collection::vec((0u32..5, 0u32..4), 0..12)) {
            let policy = LivenessPolicy::default();
            let sessions: Vec<ScheduledSession> = slots
                .iter()
                .enumerate()
                .map(|(i, (day, hour))| {
                    if *day == 4 {
                        session(i as i32, "not-a-date", "09:00")
                    } else {
                        session(i as i32, &format!("2025-01-1{day}"), &format!("{:02}:00", 8 + hour))
                    }
                })
                .collect();

            let once = build_schedule(sessions, &policy);
            let mut twice = once.clone();
            sort_chronologically(&mut twice);
            prop_assert_eq!(&once, &twice);

            for pair in once.windows(2) {
                match (pair[0].start, pair[1].start) {
                    (Some(a), Some(b)) => {
                        prop_assert!(a <= b);
                        if a == b {
                            prop_assert!(pair[0].session.sessionid < pair[1].session.sessionid);
                        }
                    }
                    (None, Some(_)) => prop_assert!(false, "malformed row sorted before a valid one"),
                    _ => {}
                }
            }
        }

        #[test]
        fn live_selection_wins_whenever_any_session_is_live(
            hours in proptest::collection::vec(0i64..24, 1..8),
            probe_minutes in 0i64..(24 * 60),
        ) {
            let policy = LivenessPolicy::default();
            let sessions: Vec<ScheduledSession> = hours
                .iter()
                .enumerate()
                .map(|(i, hour)| session(i as i32, "2025-01-10", &format!("{hour:02}:00")))
                .collect();
            let entries = build_schedule(sessions, &policy);
            let day_start = policy.timezone.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap().with_timezone(&Utc);
            let now = day_start + TimeDelta::minutes(probe_minutes);

            let any_live = entries.iter().any(|entry| entry.is_live(&policy, now));
            let selection = select_badge(&entries, &policy, now);
            if any_live {
                prop_assert_eq!(selection.kind(), BadgeKind::Live);
            } else if let Some(next) = entries.iter().find(|entry| entry.starts_after(now)) {
                prop_assert_eq!(selection, BadgeSelection::Upcoming(next));
            } else {
                prop_assert_eq!(selection, BadgeSelection::None);
            }
        }
    }
}
