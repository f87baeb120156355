use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_WINDOW_SECS: u64 = 60 * 60;
const MAX_WINDOW_WEEKS: i64 = 52 * 100;

/// The span between two scheduled polls.
///
/// An entry belongs to the poll at `now` iff `now - width <= published_at < now`.
/// With back-to-back triggers every entry lands in exactly one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWindow {
    width: Duration,
}

impl PollWindow {
    pub fn new(width: Duration) -> Self {
        Self { width }
    }

    pub fn from_secs(secs: u64) -> Self {
        let width = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::weeks(MAX_WINDOW_WEEKS));
        Self::new(width)
    }

    pub fn hourly() -> Self {
        Self::from_secs(DEFAULT_WINDOW_SECS)
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.width)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Scheduled end of the `tick`-th window counted from `origin`.
    ///
    /// Ticks are derived from the origin, not the wall clock, so a slow poll
    /// never shifts the windows that follow it.
    pub fn tick_at(&self, origin: DateTime<Utc>, tick: u32) -> DateTime<Utc> {
        i32::try_from(tick)
            .ok()
            .and_then(|tick| self.width.checked_mul(tick))
            .and_then(|offset| origin.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn contains(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.start(now) <= published_at && published_at < now
    }
}

impl Default for PollWindow {
    fn default() -> Self {
        Self::hourly()
    }
}
