//! Per-domain adaptive rate limiting
//!
//! This module computes the delay to observe before the next request to a
//! domain, given the latency of the response just observed, so that the
//! presented load on the remote server stays under a configured ceiling.

mod adaptive;

pub use adaptive::{normalize_domain, AdaptiveDelay, AdaptiveDelayConfig};
