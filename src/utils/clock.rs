use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;

    /// Calendar day in local time. Work is always bucketed by this value.
    fn today(&self) -> NaiveDate {
        self.time().date_naive()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock frozen at a point in time that only moves when advanced. Clones share the same time.
#[derive(Clone)]
pub struct FixedClock {
    time: Arc<Mutex<DateTime<Local>>>,
}

impl FixedClock {
    pub fn new(time: DateTime<Local>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.time.lock().unwrap_or_else(|e| e.into_inner());
        *time += duration;
    }
}

#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Local> {
        *self.time.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Converts a tracking interval into the tokio representation.
pub fn to_std_duration(duration: chrono::Duration) -> Duration {
    duration.to_std().unwrap_or(Duration::ZERO)
}
