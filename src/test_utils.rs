use crate::database::session::SessionSource;
use crate::error::app_error::AppError;
use crate::models::session::ScheduledSession;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub fn sample_session(id: i32, date: &str, time: &str) -> ScheduledSession {
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

/// Returns whatever rows it currently holds.
pub struct StaticSource {
    rows: Mutex<Vec<ScheduledSession>>,
    fail_next: AtomicBool,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(rows: Vec<ScheduledSession>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail_next: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, rows: Vec<ScheduledSession>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionSource for StaticSource {
    async fn fetch_sessions(&self) -> Result<Vec<ScheduledSession>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::Unavailable("backend unreachable".to_string()));
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}

pub struct FailingSource;

#[async_trait::async_trait]
impl SessionSource for FailingSource {
    async fn fetch_sessions(&self) -> Result<Vec<ScheduledSession>, AppError> {
        Err(AppError::Unavailable("backend unreachable".to_string()))
    }
}

/// Answers queued "immediate" calls at once; any other call blocks until
/// [`GatedSource::release`] hands it rows.
pub struct GatedSource {
    callers: AtomicUsize,
    immediate: Mutex<VecDeque<Vec<ScheduledSession>>>,
    released: Mutex<Option<Vec<ScheduledSession>>>,
    gate: Notify,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            callers: AtomicUsize::new(0),
            immediate: Mutex::new(VecDeque::new()),
            released: Mutex::new(None),
            gate: Notify::new(),
        }
    }

    pub fn push_immediate(&self, rows: Vec<ScheduledSession>) {
        self.immediate.lock().unwrap().push_back(rows);
    }

    pub fn release(&self, rows: Vec<ScheduledSession>) {
        *self.released.lock().unwrap() = Some(rows);
        self.gate.notify_one();
    }

    pub async fn wait_for_callers(&self, count: usize) {
        while self.callers.load(Ordering::SeqCst) < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait::async_trait]
impl SessionSource for GatedSource {
    async fn fetch_sessions(&self) -> Result<Vec<ScheduledSession>, AppError> {
        self.callers.fetch_add(1, Ordering::SeqCst);

        let queued = self.immediate.lock().unwrap().pop_front();
        if let Some(rows) = queued {
            return Ok(rows);
        }

        loop {
            let released = self.released.lock().unwrap().take();
            if let Some(rows) = released {
                return Ok(rows);
            }
            self.gate.notified().await;
        }
    }
}
