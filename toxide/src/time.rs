use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
    fn now_local(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone)]
pub struct RealTimeProvider {
    timezone: Option<Tz>,
}

impl RealTimeProvider {
    pub fn new(timezone_str: Option<&str>) -> Self {
        let timezone = timezone_str.and_then(|s| s.parse::<Tz>().ok());
        Self { timezone }
    }
}

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        let now_utc = Utc::now();
        if let Some(tz) = self.timezone {
            now_utc.with_timezone(&tz).fixed_offset()
        } else {
            let local = Local::now();
            local.with_timezone(local.offset())
        }
    }
}

/// Frozen clock for tests; `advance` moves both the monotonic and the
/// wall clock.
#[derive(Debug)]
pub struct FakeTimeProvider {
    base: Instant,
    state: RwLock<(Duration, DateTime<FixedOffset>)>,
}

impl FakeTimeProvider {
    pub fn new() -> Self {
        let wall = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap();
        Self {
            base: Instant::now(),
            state: RwLock::new((Duration::ZERO, wall)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.write().unwrap();
        state.0 += by;
        state.1 += chrono::Duration::from_std(by).unwrap_or_default();
    }
}

impl Default for FakeTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now(&self) -> Instant {
        self.base + self.state.read().unwrap().0
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.state.read().unwrap().1
    }
}
