use std::time::Duration;

/// Scheduler tunables. Defaults match spec.md §6's environment variable
/// table (`MORPH_MAX_WORKERS`, `MORPH_TIMEOUT`, ...).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Size of the `ThreadPool`, and the live-worker threshold at which
    /// `register_operation` drains the queue. `0` disables the pool;
    /// requests run inline on the Scheduler's own thread instead.
    pub max_workers: usize,

    /// How long the main loop sleeps when no worker is ready to resume.
    pub poll_period: Duration,

    /// Wall-clock cap on a single `run_operations` call.
    pub overall_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 50,
            poll_period: Duration::from_millis(10),
            overall_timeout: Duration::from_secs(21_600),
        }
    }
}
