//! Defers normal-priority jobs dispatched outside the work window.

use crate::models::JobPriority;
use crate::work_window::WorkWindow;

/// Signal raised when a job must be re-queued rather than run now.
///
/// The external queue is expected to honor this by re-submitting the task
/// at `next_window_start`; no state transition happens on defer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defer {
    pub defer_seconds: i64,
}

/// Check whether `priority` may proceed right now against `window`.
///
/// `IMMEDIATE` priority and disabled windows always pass. `NORMAL`
/// priority outside an enabled window yields `Err(Defer)` parameterized by
/// the seconds until [`WorkWindow::next_start`].
pub fn check_work_window(priority: JobPriority, window: &WorkWindow) -> Result<(), Defer> {
    if priority == JobPriority::Immediate {
        return Ok(());
    }
    if window.is_active_now() {
        return Ok(());
    }
    let now = chrono::Utc::now();
    let next_start = window.next_start();
    let defer_seconds = (next_start.to_utc() - now).num_seconds().max(0);
    tracing::info!(
        priority = ?priority,
        next_window_start = %next_start,
        defer_seconds,
        "job_deferred_to_window"
    );
    Err(Defer { defer_seconds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use chrono_tz::UTC;

    #[test]
    fn immediate_always_passes() {
        let w = WorkWindow::new(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            UTC,
            true,
        );
        assert!(check_work_window(JobPriority::Immediate, &w).is_ok());
    }

    #[test]
    fn disabled_window_always_passes() {
        let w = WorkWindow::new(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            UTC,
            false,
        );
        assert!(check_work_window(JobPriority::Normal, &w).is_ok());
    }
}
