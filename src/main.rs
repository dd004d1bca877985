//! Demonstration binary
//!
//! Loads a TOML config, layers the `MORPH_*` environment overrides on top,
//! registers one scraping operation per authority, runs the scheduler to
//! completion, and reports the resulting exception map. This is the thin
//! "does the wiring actually work" driver a crate of this shape ships, the
//! way a crawler's binary is a driver over its library rather than the
//! library itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::blocking::Client;
use tracing_subscriber::EnvFilter;

use scraper_sched::config::{apply_env_overrides, load_config_with_hash, Config};
use scraper_sched::pool::CollaboratorError;
use scraper_sched::scheduler::SchedulerConfig;
use scraper_sched::worker::OperationHandle;
use scraper_sched::{Authority, Scheduler};

/// A small demonstration driver for the cooperative scraping scheduler.
#[derive(Parser, Debug)]
#[command(name = "scraper-sched")]
#[command(version = "1.0.0")]
#[command(about = "Cooperative scheduler for polite, multi-site scraping", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Uses built-in defaults when absent.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// URL template for the demo GET, with `{authority}` substituted.
    #[arg(long, default_value = "https://{authority}/")]
    url_template: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!(hash, "configuration loaded");
            config
        }
        None => {
            tracing::info!("no configuration file given, using built-in defaults");
            Config::default()
        }
    };

    let overrides = apply_env_overrides(&mut config)?;
    let authorities = overrides.authorities.unwrap_or_else(|| {
        ["example.com", "example.org", "example.net"]
            .into_iter()
            .map(str::to_string)
            .collect()
    });

    let client = Arc::new(scraper_sched::client::build_client(
        &config.client,
        &config.user_agent,
        today(),
    )?);

    let scheduler_config = SchedulerConfig {
        max_workers: config.pool.max_workers,
        poll_period: Duration::from_millis(10),
        overall_timeout: Duration::from_secs(config.pool.overall_timeout_secs),
    };
    let delay_config = scraper_sched::delay::AdaptiveDelayConfig {
        min_delay: config.delay.min_delay,
        max_delay: config.delay.max_delay,
        max_load: config.delay.max_load,
    };

    let mut scheduler = Scheduler::new(scheduler_config, delay_config);
    scheduler.set_randomize_registration(overrides.randomize);

    let operations = authorities
        .iter()
        .map(|authority| {
            let url = cli.url_template.replace("{authority}", authority.as_str());
            let client = Arc::clone(&client);
            let block: scraper_sched::UserBlock =
                Box::new(move |handle: &OperationHandle| demo_operation(handle, &client, &url));
            (Authority::new(authority.clone()), block)
        })
        .collect();

    scheduler
        .register_many(operations)
        .map_err(|authority| format!("duplicate authority: {authority}"))?;

    let exceptions = scheduler.run_operations();

    if exceptions.is_empty() {
        println!("all {} authorities completed without exception", authorities.len());
    } else {
        println!("{} authorities raised an exception:", exceptions.len());
        for (authority, error) in &exceptions {
            let expected = overrides.expect_bad.contains(authority.as_str());
            println!(
                "  - {authority}: {error}{}",
                if expected { " (expected)" } else { "" }
            );
        }
    }

    Ok(())
}

/// One operation's body: a single GET against `url`, run through the pool.
fn demo_operation(
    handle: &OperationHandle,
    client: &Arc<Client>,
    url: &str,
) -> Result<(), scraper_sched::OperationError> {
    let client = Arc::clone(client);
    let url = url.to_string();
    let status = handle.execute_request(true, move || {
        client
            .get(&url)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(|e| CollaboratorError::new(e.to_string()))
    })?;

    tracing::info!(authority = %handle.authority(), status, "demo request completed");
    Ok(())
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if std::env::var_os("DEBUG").is_some() {
        EnvFilter::new("scraper_sched=trace,info")
    } else {
        match verbose {
            0 => EnvFilter::new("scraper_sched=info,warn"),
            1 => EnvFilter::new("scraper_sched=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
