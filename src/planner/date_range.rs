//! Date-range planner
//!
//! Produces the set of date sub-ranges that should be (re-)searched on a
//! given day so that the last `everytime` days are always covered, and every
//! other day within the `days` lookback window is covered at least once
//! every `max_period` days.

use chrono::NaiveDate;
use std::collections::HashMap;

/// Planner tunables. Defaults match spec.md §4.B.
#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    /// Size of the full lookback window, in days.
    pub days: i64,

    /// Number of most-recent days that are always searched.
    pub everytime: i64,

    /// Longest gap, in days, allowed between checks of any day in the
    /// lookback window.
    pub max_period: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            days: 33,
            everytime: 4,
            max_period: 3,
        }
    }
}

/// One date sub-range the planner recommends searching today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub comment: String,
}

/// Stateful date-range planner.
///
/// Remembers, per day in the lookback window, when it was last selected, so
/// that each call can pick the band whose coverage is most overdue. Calling
/// [`DateRangePlanner::plan`] once per real-world day is what gives the
/// freshness guarantee in spec.md §4.B its meaning.
#[derive(Debug, Clone, Default)]
pub struct DateRangePlanner {
    config: PlannerConfig,
    last_checked: HashMap<NaiveDate, NaiveDate>,
}

/// One age band: covers ages `[age_start, age_start + width - 1]` (in days
/// before `today`), rechecked every `interval` days.
struct Band {
    age_start: i64,
    width: i64,
    interval: i64,
}

impl DateRangePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            last_checked: HashMap::new(),
        }
    }

    /// Computes today's ranges and updates internal "last checked" state.
    pub fn plan(&mut self, today: NaiveDate) -> Vec<DateRange> {
        let cfg = self.config;
        let window_start = today - chrono::Duration::days(cfg.days.max(1) - 1);

        let mut due: Vec<(NaiveDate, &'static str, i64)> = Vec::new();

        // The everytime window is always searched, unconditionally.
        let everytime_span = cfg.everytime.max(0).min(cfg.days.max(0));
        let everytime_start = today - chrono::Duration::days(everytime_span.max(1) - 1);
        let mut day = everytime_start;
        while day <= today {
            due.push((day, "everytime", 0));
            day = day.succ_opt().unwrap_or(day);
            if day > today {
                break;
            }
        }

        // Older days: Fibonacci-growing bands, each interval capped at max_period.
        if cfg.days > cfg.everytime {
            let remaining_span = cfg.days - cfg.everytime;
            for band in Self::bands(remaining_span, cfg.max_period.max(1)) {
                let oldest_age = (band.age_start + band.width - 1).min(cfg.days - 1);
                let newest_age = band.age_start;
                let mut age = newest_age;
                while age <= oldest_age {
                    let d = today - chrono::Duration::days(cfg.everytime + age);
                    if d < window_start {
                        break;
                    }
                    let overdue = match self.last_checked.get(&d) {
                        Some(last) => (today - *last).num_days() >= band.interval,
                        None => true,
                    };
                    if overdue {
                        due.push((d, "periodic", band.interval));
                    }
                    age += 1;
                }
            }
        }

        due.sort_by_key(|(d, _, _)| *d);
        due.dedup_by_key(|(d, _, _)| *d);

        // Mark every selected day as checked today.
        for (d, _, _) in &due {
            self.last_checked.insert(*d, today);
        }
        self.prune(today);

        Self::merge_ranges(due)
    }

    /// Builds the Fibonacci-growing band sequence covering `remaining_span`
    /// days of age beyond the everytime window, each band's interval capped
    /// at `max_period`.
    fn bands(remaining_span: i64, max_period: i64) -> Vec<Band> {
        let mut widths = vec![2i64, 3, 5];
        let mut covered: i64 = widths.iter().sum();
        while covered < remaining_span {
            let next = widths[widths.len() - 1] + widths[widths.len() - 2];
            covered += next;
            widths.push(next);
        }

        let mut bands = Vec::with_capacity(widths.len());
        let mut age_start = 0;
        for width in widths {
            if age_start >= remaining_span {
                break;
            }
            bands.push(Band {
                age_start,
                width,
                interval: width.min(max_period),
            });
            age_start += width;
        }
        bands
    }

    /// Drops state for days that have fallen out of the lookback window (with
    /// a `max_period` buffer, so a day isn't forgotten right before its
    /// recheck would have been due).
    fn prune(&mut self, today: NaiveDate) {
        let cutoff = today - chrono::Duration::days(self.config.days + self.config.max_period);
        self.last_checked.retain(|d, _| *d >= cutoff);
    }

    fn merge_ranges(mut due: Vec<(NaiveDate, &'static str, i64)>) -> Vec<DateRange> {
        due.sort_by_key(|(d, _, _)| *d);
        let mut ranges = Vec::new();
        let mut iter = due.into_iter().peekable();

        while let Some((start, kind, interval)) = iter.next() {
            let mut end = start;
            let mut kinds = vec![Self::describe(kind, interval)];
            while let Some((next_day, next_kind, next_interval)) = iter.peek().copied() {
                if next_day == end.succ_opt().unwrap_or(next_day) {
                    end = next_day;
                    let desc = Self::describe(next_kind, next_interval);
                    if !kinds.contains(&desc) {
                        kinds.push(desc);
                    }
                    iter.next();
                } else {
                    break;
                }
            }
            ranges.push(DateRange {
                from: start,
                to: end,
                comment: kinds.join(" + "),
            });
        }

        ranges
    }

    fn describe(kind: &str, interval: i64) -> String {
        if kind == "everytime" {
            "everytime window".to_string()
        } else {
            format!("periodic band (every {interval}d)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ranges_are_subset_of_lookback_window() {
        let mut planner = DateRangePlanner::new(PlannerConfig::default());
        let today = date(2026, 7, 28);
        let ranges = planner.plan(today);
        let window_start = today - chrono::Duration::days(32);
        for r in &ranges {
            assert!(r.from >= window_start && r.to <= today, "range out of window: {r:?}");
        }
    }

    #[test]
    fn days_less_than_everytime_returns_only_everytime_window() {
        let mut planner = DateRangePlanner::new(PlannerConfig {
            days: 3,
            everytime: 4,
            max_period: 3,
        });
        let today = date(2026, 7, 28);
        let ranges = planner.plan(today);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].from, today - chrono::Duration::days(2));
        assert_eq!(ranges[0].to, today);
    }

    #[test]
    fn everytime_window_is_always_included() {
        let mut planner = DateRangePlanner::new(PlannerConfig::default());
        let today = date(2026, 7, 28);
        for _ in 0..5 {
            let ranges = planner.plan(today);
            let everytime_start = today - chrono::Duration::days(3);
            assert!(ranges
                .iter()
                .any(|r| r.from <= everytime_start && r.to >= today));
        }
    }

    /// Simulates the planner running once per day for 2*days iterations and
    /// checks the correctness property from spec.md §8: after warm-up, every
    /// day within the trailing window was checked, with gaps no larger than
    /// max_period.
    #[test]
    fn simulating_daily_calls_bounds_every_days_gap() {
        let cfg = PlannerConfig {
            days: 33,
            everytime: 4,
            max_period: 3,
        };
        let mut planner = DateRangePlanner::new(cfg);
        let mut checked_on: HashMap<NaiveDate, Vec<NaiveDate>> = HashMap::new();

        let start = date(2026, 1, 1);
        for i in 0..(cfg.days * 2) {
            let today = start + chrono::Duration::days(i);
            for r in planner.plan(today) {
                let mut d = r.from;
                while d <= r.to {
                    checked_on.entry(d).or_default().push(today);
                    d = d.succ_opt().unwrap();
                }
            }
        }

        let last_today = start + chrono::Duration::days(cfg.days * 2 - 1);
        let warm_start = last_today - chrono::Duration::days(cfg.days - 1);

        let mut day = warm_start;
        while day <= last_today {
            let history = checked_on.get(&day);
            assert!(history.is_some(), "day {day} was never checked");
            let checks = history.unwrap();
            assert!(!checks.is_empty());

            // Every consecutive pair of checks for this day (while it's
            // still inside the lookback window) must be within max_period.
            for pair in checks.windows(2) {
                let gap = (pair[1] - pair[0]).num_days();
                assert!(
                    gap <= cfg.max_period,
                    "day {day} had a gap of {gap} between checks {pair:?}"
                );
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn ranges_do_not_overlap_and_are_sorted() {
        let mut planner = DateRangePlanner::new(PlannerConfig::default());
        let ranges = planner.plan(date(2026, 7, 28));
        for pair in ranges.windows(2) {
            assert!(pair[0].to < pair[1].from, "ranges overlap or are out of order: {pair:?}");
        }
    }
}
