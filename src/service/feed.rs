//! Keeps the in-memory session schedule fresh.
//!
//! The feed is the only writer of the schedule; route handlers read the
//! latest snapshot through a `watch` channel. Every refresh takes a token when
//! it starts, and a finished fetch replaces the snapshot only if no refresh
//! started after it has already landed.

use crate::config::SessionsConfig;
use crate::database::session::SessionSource;
use crate::error::app_error::AppError;
use crate::service::schedule::{LivenessPolicy, ScheduleEntry, build_schedule};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("session source failed: {0}")]
    Source(#[from] AppError),
    #[error("session fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Source(source) => source,
            FeedError::Timeout(after) => AppError::Unavailable(format!("session list did not load within {}s", after.as_secs())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Token of the refresh that produced this snapshot; 0 before the first load.
    pub token: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Chronological order.
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { sessions: usize },
    /// A refresh started later already landed; this result was dropped.
    Superseded,
    /// The feed was stopped while the fetch was in flight.
    Closed,
}

pub struct SessionFeed {
    source: Arc<dyn SessionSource>,
    policy: LivenessPolicy,
    poll_interval: Duration,
    fetch_timeout: Duration,
    next_token: AtomicU64,
    closed: AtomicBool,
    snapshot: watch::Sender<Arc<SessionSnapshot>>,
}

impl SessionFeed {
    pub fn new(source: Arc<dyn SessionSource>, policy: LivenessPolicy, config: &SessionsConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(SessionSnapshot::default()));
        Self {
            source,
            policy,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs.max(1)),
            next_token: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            snapshot,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_intervals(mut self, poll_interval: Duration, fetch_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn policy(&self) -> &LivenessPolicy {
        &self.policy
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting results. In-flight fetches finish but are discarded.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("session feed closed");
        }
    }

    /// Fetches every session and replaces the schedule. On failure the
    /// previous schedule stays in place.
    pub async fn refresh(&self) -> Result<RefreshOutcome, FeedError> {
        if self.is_closed() {
            return Ok(RefreshOutcome::Closed);
        }

        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(token, "refreshing session list");

        let rows = match tokio::time::timeout(self.fetch_timeout, self.source.fetch_sessions()).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => {
                warn!(token, error = ?err, "session fetch failed; keeping previous list");
                return Err(FeedError::Source(err));
            }
            Err(_) => {
                warn!(token, timeout_secs = self.fetch_timeout.as_secs(), "session fetch timed out; keeping previous list");
                return Err(FeedError::Timeout(self.fetch_timeout));
            }
        };

        let entries = build_schedule(rows, &self.policy);
        let count = entries.len();
        let malformed = entries.iter().filter(|entry| entry.start.is_none()).count();
        if malformed > 0 {
            warn!(token, malformed, "sessions with an unreadable date or time are never live or upcoming");
        }

        let next = Arc::new(SessionSnapshot {
            token,
            refreshed_at: Some(Utc::now()),
            entries,
        });

        let applied = self.snapshot.send_if_modified(|current| {
            if self.closed.load(Ordering::SeqCst) || token <= current.token {
                return false;
            }
            *current = next;
            true
        });

        if applied {
            debug!(token, sessions = count, "session list replaced");
            Ok(RefreshOutcome::Applied { sessions: count })
        } else if self.is_closed() {
            Ok(RefreshOutcome::Closed)
        } else {
            debug!(token, "dropping superseded session fetch");
            Ok(RefreshOutcome::Superseded)
        }
    }

    /// Runs one refresh in the background, e.g. when a member signs in.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let feed = Arc::clone(self);
        tokio::spawn(async move {
            // refresh() logs its own failures
            let _ = feed.refresh().await;
        })
    }

    /// Refreshes immediately and then on every poll tick until the returned
    /// handle is stopped or dropped.
    pub fn spawn_polling(self: Arc<Self>) -> PollerHandle {
        let feed = Arc::clone(&self);
        let poll_interval = self.poll_interval;
        info!(poll_interval_secs = poll_interval.as_secs(), "starting session poller");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.is_closed() {
                    break;
                }
                // Failures wait for the next tick; refresh() has logged them.
                let _ = self.refresh().await;
            }
        });

        PollerHandle { feed, task }
    }
}

pub struct PollerHandle {
    feed: Arc<SessionFeed>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.feed.close();
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
