//! Adaptive per-domain delay calculator
//!
//! Given an observed response time for a URL, [`AdaptiveDelay::next_delay`]
//! returns the delay to observe before the next request to that URL's
//! domain, smoothing the result across calls so that a single slow response
//! doesn't cause an overreaction.

use std::collections::HashMap;

/// Configuration bounds for the adaptive delay calculator.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveDelayConfig {
    /// Lower clamp on the returned delay, in seconds.
    pub min_delay: f64,

    /// Upper clamp on the returned delay, in seconds.
    pub max_delay: f64,

    /// Maximum percentage of wall time the remote server should spend
    /// serving us, 1-99. Values outside that range are clamped.
    pub max_load: u8,
}

impl Default for AdaptiveDelayConfig {
    fn default() -> Self {
        Self {
            min_delay: 0.0,
            max_delay: 30.0,
            max_load: 20,
        }
    }
}

impl AdaptiveDelayConfig {
    fn clamped_max_load(&self) -> f64 {
        self.max_load.clamp(1, 99) as f64
    }

    /// `response_multiplier = (100 - max_load) / max_load`.
    fn response_multiplier(&self) -> f64 {
        (100.0 - self.clamped_max_load()) / self.clamped_max_load()
    }
}

/// Lowercases `scheme://host` so that domain lookups are case-insensitive.
///
/// Accepts either a bare host (`"Example.COM"`) or a full URL
/// (`"HTTPS://Example.COM/path"`); in both cases the returned key is the
/// lowercase `scheme+host` (or just the lowercase host if no scheme was
/// present).
pub fn normalize_domain(input: &str) -> String {
    match url::Url::parse(input) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or(input);
            format!("{}{}", parsed.scheme(), host).to_lowercase()
        }
        Err(_) => input.to_lowercase(),
    }
}

/// Per-domain adaptive delay calculator.
///
/// Read and written only from the scheduler's own thread (see spec §5), so
/// this type carries no internal synchronisation.
#[derive(Debug, Clone)]
pub struct AdaptiveDelay {
    config: AdaptiveDelayConfig,
    state: HashMap<String, f64>,
}

impl AdaptiveDelay {
    /// Creates a new calculator with the given bounds.
    pub fn new(config: AdaptiveDelayConfig) -> Self {
        Self {
            config,
            state: HashMap::new(),
        }
    }

    /// Computes and stores the next delay for `domain`, given a
    /// `response_time` (in seconds) just observed for that domain.
    ///
    /// `domain` may be a bare host or a full URL; it is normalised
    /// internally via [`normalize_domain`].
    pub fn next_delay(&mut self, domain: &str, response_time: f64) -> f64 {
        let key = normalize_domain(domain);

        let target = (response_time * self.config.response_multiplier())
            .clamp(0.0, self.config.max_delay);

        let current = *self.state.get(&key).unwrap_or(&target);

        // 4-tap exponential smoother: weight the last delay 3x against the
        // freshly computed target.
        let new_delay = ((3.0 * current + target) / 4.0)
            .clamp(self.config.min_delay, self.config.max_delay);

        self.state.insert(key, new_delay);
        new_delay
    }

    /// Returns the currently stored delay for a domain, if any request has
    /// been observed for it yet.
    pub fn current_delay(&self, domain: &str) -> Option<f64> {
        self.state.get(&normalize_domain(domain)).copied()
    }

    /// Clears all learned per-domain state (used by `Scheduler::reset!`).
    pub fn reset(&mut self) {
        self.state.clear();
    }
}
