//! Date-range planning
//!
//! Computes which historical date windows to re-search on a given run so
//! that aggregate server load stays down while every day is guaranteed to
//! be rechecked within `max_period` days.

mod date_range;

pub use date_range::{DateRange, DateRangePlanner, PlannerConfig};
