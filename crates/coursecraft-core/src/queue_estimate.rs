//! Predicts queue position, start time, and completion time honoring the
//! work window.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::work_window::WorkWindow;

/// Fallback average job duration when no historical data is available.
pub const DEFAULT_AVG_DURATION: Duration = Duration::minutes(10);

/// Estimated timing for the next job submitted to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEstimate {
    pub position_in_queue: u32,
    pub estimated_start: DateTime<Tz>,
    pub estimated_complete: DateTime<Tz>,
    pub next_window_start: Option<DateTime<Tz>>,
    pub human_summary: String,
}

fn format_duration(d: Duration) -> String {
    let total_seconds = d.num_seconds();
    if total_seconds < 60 {
        return format!("{total_seconds}s");
    }
    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;
    if remaining_minutes != 0 {
        format!("{hours}h{remaining_minutes}m")
    } else {
        format!("{hours}h")
    }
}

/// Build an estimate for the job that would be submitted right now.
///
/// `pending_count` is the number of jobs already queued ahead of it (the
/// new job lands at `pending_count + 1`). `avg_duration` is the
/// historical average job duration, or `None` to fall back to
/// [`DEFAULT_AVG_DURATION`].
pub fn estimate_job(
    pending_count: u32,
    avg_duration: Option<Duration>,
    window: &WorkWindow,
) -> QueueEstimate {
    let avg = avg_duration.unwrap_or(DEFAULT_AVG_DURATION);
    let position = pending_count + 1;
    let queue_work = avg * pending_count as i32;

    let now = window.now();
    let (start_base, next_window) = if window.enabled() && !window.is_active_now() {
        let next = window.next_start();
        (next, Some(next))
    } else {
        let next = if window.enabled() {
            Some(window.next_start())
        } else {
            None
        };
        (now, next)
    };

    let estimated_start = window.advance_through(start_base, queue_work);
    let estimated_complete = window.advance_through(estimated_start, avg);

    let human_summary = if window.enabled() {
        format!(
            "{pending_count} job(s) in queue, ~{} per job, work window enabled",
            format_duration(avg)
        )
    } else {
        format!(
            "{pending_count} job(s) in queue, ~{} per job, 24/7 mode",
            format_duration(avg)
        )
    };

    QueueEstimate {
        position_in_queue: position,
        estimated_start,
        estimated_complete,
        next_window_start: if window.enabled() { next_window } else { None },
        human_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use chrono_tz::UTC;

    #[test]
    fn position_is_pending_plus_one() {
        let w = WorkWindow::new(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            UTC,
            false,
        );
        let estimate = estimate_job(4, None, &w);
        assert_eq!(estimate.position_in_queue, 5);
    }

    #[test]
    fn disabled_window_is_wall_clock() {
        let w = WorkWindow::new(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            UTC,
            false,
        );
        let estimate = estimate_job(0, Some(Duration::minutes(5)), &w);
        assert!(estimate.next_window_start.is_none());
        assert_eq!(
            estimate.estimated_complete - estimate.estimated_start,
            Duration::minutes(5)
        );
    }

    #[test]
    fn enabled_window_reports_next_window_start() {
        let w = WorkWindow::new(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            UTC,
            true,
        );
        let estimate = estimate_job(0, None, &w);
        assert!(estimate.next_window_start.is_some());
    }

    #[test]
    fn format_duration_variants() {
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::minutes(10)), "10m");
        assert_eq!(format_duration(Duration::minutes(90)), "1h30m");
        assert_eq!(format_duration(Duration::hours(2)), "2h");
    }
}
