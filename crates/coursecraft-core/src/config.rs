//! Typed configuration, constructed once at process startup and threaded
//! through constructors — no global mutable singleton.

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::work_window::WorkWindow;

/// Startup configuration for the work window. Kept separate from the
/// rest of process config so every crate that needs a [`WorkWindow`] can
/// depend on just this, not a kitchen-sink settings struct.
#[derive(Debug, Clone)]
pub struct WorkWindowConfig {
    pub heavy_window_start: NaiveTime,
    pub heavy_window_end: NaiveTime,
    pub heavy_window_tz: Tz,
    pub heavy_window_enabled: bool,
}

impl WorkWindowConfig {
    /// Build the runtime [`WorkWindow`] value from this configuration.
    pub fn work_window(&self) -> WorkWindow {
        WorkWindow::new(
            self.heavy_window_start,
            self.heavy_window_end,
            self.heavy_window_tz,
            self.heavy_window_enabled,
        )
    }
}

/// Process-wide timeouts and retry limits from the concurrency model.
#[derive(Debug, Clone, Copy)]
pub struct JobExecutionConfig {
    /// Per-attempt timeout before a job is marked `failed`.
    pub job_timeout_seconds: u64,
    /// Retries the external queue performs for transient errors.
    pub max_tries: u32,
}

impl Default for JobExecutionConfig {
    fn default() -> Self {
        Self {
            job_timeout_seconds: 1800,
            max_tries: 3,
        }
    }
}

/// Sliding-window rate limiter configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub window_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { window_seconds: 60 }
    }
}
