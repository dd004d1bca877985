use crate::config::types::Config;
use crate::config::validation::validate_proxy_url;
use crate::ConfigError;
use std::collections::HashSet;
use std::env;

/// Everything the environment can tell the scheduler that isn't a tunable
/// on [`Config`] itself: the authority allow-list, the expected-failure
/// list, and the "don't randomise" flag spec.md §9 calls out. Layered on
/// top of a loaded [`Config`] the same way `sumi-ripple`'s env overrides sit
/// on top of its TOML file, just with one extra struct since this crate's
/// environment carries run-selection data, not just tunables.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub authorities: Option<HashSet<String>>,
    pub expect_bad: HashSet<String>,
    pub randomize: bool,
}

/// Applies the `MORPH_*` environment variables from spec.md §6 on top of a
/// loaded [`Config`], mutating it in place, and returns the run-selection
/// overrides that have no home on `Config` itself.
pub fn apply_env_overrides(config: &mut Config) -> Result<RunOverrides, ConfigError> {
    if env::var_os("MORPH_DISABLE_THREADS").is_some() {
        config.pool.max_workers = 0;
    } else if let Some(max_workers) = parse_env("MORPH_MAX_WORKERS")? {
        config.pool.max_workers = max_workers;
    }

    if let Some(timeout) = parse_env("MORPH_TIMEOUT")? {
        config.pool.overall_timeout_secs = timeout;
    }

    if let Some(timeout) = parse_env("MORPH_CLIENT_TIMEOUT")? {
        config.client.timeout_secs = timeout;
    }

    if let Some(max_load) = parse_env("MORPH_MAX_LOAD")? {
        config.delay.max_load = max_load;
    }

    if env::var_os("MORPH_DISABLE_SSL_CHECK").is_some() {
        config.client.disable_ssl_check = true;
    }

    if env::var_os("MORPH_USE_PROXY").is_some() {
        config.client.use_proxy = true;
    }

    if let Ok(proxy_url) = env::var("MORPH_AUSTRALIAN_PROXY") {
        validate_proxy_url(&proxy_url)?;
        config.client.proxy_url = Some(proxy_url);
    }

    if let Ok(user_agent) = env::var("MORPH_USER_AGENT") {
        config.user_agent.template = Some(user_agent);
    }

    let authorities = env::var("MORPH_AUTHORITIES")
        .ok()
        .map(|raw| split_csv(&raw));

    let expect_bad = env::var("MORPH_EXPECT_BAD")
        .ok()
        .map(|raw| split_csv(&raw))
        .unwrap_or_default();

    let randomize = env::var_os("MORPH_NOT_RANDOM").is_none();

    Ok(RunOverrides { authorities, expect_bad, randomize })
}

fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Validation(format!("{name}: invalid value '{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

fn split_csv(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replaces the `TODAY` token in a user-agent template with today's ISO
/// date, per spec.md §6.
pub fn substitute_today(template: &str, today: chrono::NaiveDate) -> String {
    template.replace("TODAY", &today.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialise tests that touch
    // MORPH_* so they don't stomp on each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn disable_threads_forces_zero_workers_even_if_max_workers_is_also_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MORPH_DISABLE_THREADS", "1");
        env::set_var("MORPH_MAX_WORKERS", "12");
        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.pool.max_workers, 0);
        env::remove_var("MORPH_DISABLE_THREADS");
        env::remove_var("MORPH_MAX_WORKERS");
    }

    #[test]
    fn authorities_and_expect_bad_are_parsed_as_trimmed_sets() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MORPH_AUTHORITIES", "a.com, b.com,c.com");
        env::set_var("MORPH_EXPECT_BAD", "b.com");
        let mut config = Config::default();
        let overrides = apply_env_overrides(&mut config).unwrap();
        let authorities = overrides.authorities.unwrap();
        assert_eq!(authorities.len(), 3);
        assert!(authorities.contains("a.com"));
        assert!(overrides.expect_bad.contains("b.com"));
        env::remove_var("MORPH_AUTHORITIES");
        env::remove_var("MORPH_EXPECT_BAD");
    }

    #[test]
    fn not_random_disables_randomisation() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MORPH_NOT_RANDOM", "1");
        let mut config = Config::default();
        let overrides = apply_env_overrides(&mut config).unwrap();
        assert!(!overrides.randomize);
        env::remove_var("MORPH_NOT_RANDOM");
    }

    #[test]
    fn invalid_proxy_url_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MORPH_AUSTRALIAN_PROXY", "not a url");
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);
        assert!(result.is_err());
        env::remove_var("MORPH_AUSTRALIAN_PROXY");
    }

    #[test]
    fn today_token_is_replaced_with_iso_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let result = substitute_today("ScraperUtils/1.0 TODAY", date);
        assert_eq!(result, "ScraperUtils/1.0 2026-07-28");
    }
}
