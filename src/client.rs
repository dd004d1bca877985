//! HTTP client construction
//!
//! This is the construction site for the external collaborator spec.md §1
//! excludes from scope (the HTTP client library itself): we depend on
//! `reqwest`'s blocking client rather than writing one, and this module's
//! only job is building a correctly-configured instance of it from
//! [`crate::config::Config`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Proxy;

use crate::config::{substitute_today, ClientConfig, UserAgentConfig};
use crate::SchedulerError;

/// Builds the default `Mozilla/5.0 (compatible; ScraperUtils/<version>
/// <ISO-date>; +<project-url>)` identity string, or applies the
/// `MORPH_USER_AGENT` template override with its `TODAY` token substituted,
/// per spec.md §6.
pub fn build_user_agent(config: &UserAgentConfig, today: chrono::NaiveDate) -> String {
    match &config.template {
        Some(template) => substitute_today(template, today),
        None => format!(
            "Mozilla/5.0 (compatible; {}/{} {}; +{})",
            config.crawler_name,
            config.crawler_version,
            today.format("%Y-%m-%d"),
            config.contact_url,
        ),
    }
}

/// Builds a blocking `reqwest::Client` from [`ClientConfig`], wiring in the
/// user agent, per-request timeout, proxy, and SSL verification toggle.
///
/// Configuration-level failures here (bad proxy URL, client construction
/// failure) are fatal at setup time, before any scraping begins, matching
/// spec.md §7's "Configuration / fatal" error kind.
pub fn build_client(
    client_config: &ClientConfig,
    user_agent_config: &UserAgentConfig,
    today: chrono::NaiveDate,
) -> Result<Client, SchedulerError> {
    let mut builder = Client::builder()
        .user_agent(build_user_agent(user_agent_config, today))
        .timeout(Duration::from_secs(client_config.timeout_secs))
        .danger_accept_invalid_certs(client_config.disable_ssl_check);

    if client_config.use_proxy {
        let proxy_url = client_config.proxy_url.as_deref().ok_or_else(|| {
            SchedulerError::Config(crate::ConfigError::Validation(
                "use_proxy is set but no proxy_url was configured".to_string(),
            ))
        })?;
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}
