//! Time-of-day window gating heavy (GPU/network-bound) operations.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Configured interval during which heavy normal-priority jobs may run.
///
/// Supports overnight windows (`start > end`, e.g. 22:00 → 06:00).
/// When `enabled` is `false` the window behaves as 24/7: [`Self::is_active_now`]
/// is always `true` and [`Self::remaining_today`] reports a full day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    pub(crate) start: NaiveTime,
    pub(crate) end: NaiveTime,
    pub(crate) tz: Tz,
    pub(crate) enabled: bool,
}

impl WorkWindow {
    /// Construct a window. `tz` must be a valid IANA zone name; an invalid
    /// name is a configuration error, not a silent UTC fallback, so
    /// callers resolve it at startup via [`std::str::FromStr`] on [`Tz`].
    pub fn new(start: NaiveTime, end: NaiveTime, tz: Tz, enabled: bool) -> Self {
        Self {
            start,
            end,
            tz,
            enabled,
        }
    }

    /// Whether the window configuration is enabled at all.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Window spans midnight (e.g. 22:00 → 06:00).
    pub fn is_overnight(&self) -> bool {
        self.start > self.end
    }

    pub(crate) fn now(&self) -> DateTime<Tz> {
        self.tz.from_utc_datetime(&chrono::Utc::now().naive_utc())
    }

    /// Whether `instant` falls inside the window bounds, ignoring
    /// `enabled` (disabled-window handling is the caller's concern — see
    /// [`Self::is_active_now`]).
    fn is_active_at(&self, instant: DateTime<Tz>) -> bool {
        let t = instant.time();
        if self.is_overnight() {
            t >= self.start || t < self.end
        } else {
            self.start <= t && t < self.end
        }
    }

    /// The next window opening at or after `cursor`.
    fn next_open_from(&self, cursor: DateTime<Tz>) -> DateTime<Tz> {
        let today_start = cursor
            .date_naive()
            .and_time(self.start)
            .and_local_timezone(self.tz)
            .single()
            .unwrap_or(cursor);
        if cursor < today_start {
            today_start
        } else {
            today_start + Duration::days(1)
        }
    }

    /// Time from `cursor` until the window closes, assuming `cursor` is
    /// inside the window. Clamped to zero.
    fn remaining_from(&self, cursor: DateTime<Tz>) -> Duration {
        let mut close = cursor
            .date_naive()
            .and_time(self.end)
            .and_local_timezone(self.tz)
            .single()
            .unwrap_or(cursor);
        if self.is_overnight() && cursor.time() >= self.start {
            close += Duration::days(1);
        }
        (close - cursor).max(Duration::zero())
    }

    /// Whether the window is open at the current instant.
    pub fn is_active_now(&self) -> bool {
        !self.enabled || self.is_active_at(self.now())
    }

    /// When the window next opens. If disabled, returns the current
    /// instant (the window is always open). If currently open, returns
    /// the *next* opening (tomorrow's start).
    pub fn next_start(&self) -> DateTime<Tz> {
        if !self.enabled {
            return self.now();
        }
        self.next_open_from(self.now())
    }

    /// Time remaining until the window closes. Zero if currently outside
    /// the window; a full day if disabled.
    pub fn remaining_today(&self) -> Duration {
        if !self.enabled {
            return Duration::hours(24);
        }
        if !self.is_active_now() {
            return Duration::zero();
        }
        self.remaining_from(self.now())
    }

    /// Advance `work` of processing time forward from `start`, honoring
    /// the window: time outside an enabled window does not count. Capped
    /// at 400 iterations to guard against a misconfigured window that
    /// never opens.
    pub(crate) fn advance_through(&self, start: DateTime<Tz>, work: Duration) -> DateTime<Tz> {
        if !self.enabled {
            return start + work;
        }
        let mut remaining = work;
        let mut cursor = start;
        for _ in 0..400 {
            if remaining <= Duration::zero() {
                break;
            }
            if !self.is_active_at(cursor) {
                cursor = self.next_open_from(cursor);
                continue;
            }
            let window_remaining = self.remaining_from(cursor);
            if remaining <= window_remaining {
                cursor += remaining;
                remaining = Duration::zero();
            } else {
                remaining -= window_remaining;
                cursor += window_remaining;
            }
        }
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    fn window(start_h: u32, end_h: u32, enabled: bool) -> WorkWindow {
        WorkWindow::new(
            NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(end_h, 0, 0).unwrap(),
            UTC,
            enabled,
        )
    }

    #[test]
    fn disabled_window_is_always_active() {
        let w = window(2, 6, false);
        assert!(w.is_active_now());
        assert_eq!(w.remaining_today(), Duration::hours(24));
    }

    #[test]
    fn overnight_window_detected() {
        let w = window(22, 6, true);
        assert!(w.is_overnight());
        let regular = window(2, 6, true);
        assert!(!regular.is_overnight());
    }

    #[test]
    fn next_start_is_in_the_future() {
        let w = window(2, 6, true);
        assert!(w.next_start() >= w.now());
    }

    #[test]
    fn advance_through_disabled_window_is_wall_clock() {
        let w = window(2, 6, false);
        let start = w.now();
        let end = w.advance_through(start, Duration::hours(3));
        assert_eq!(end, start + Duration::hours(3));
    }

    #[test]
    fn advance_through_terminates_on_misconfigured_window() {
        // start == end would never open; must not hang.
        let w = window(5, 5, true);
        let start = w.now();
        let _ = w.advance_through(start, Duration::hours(1));
    }

    proptest::proptest! {
        #[test]
        fn overnight_correctness(start_h in 0u32..24, end_h in 0u32..24) {
            if start_h == end_h {
                return Ok(());
            }
            let w = window(start_h, end_h, true);
            if w.is_overnight() {
                let now_time = w.now().time();
                let expect = now_time >= w.start || now_time < w.end;
                proptest::prop_assert_eq!(w.is_active_now(), expect);
            }
        }
    }
}
