use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates a configuration file from the given path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content, for
/// diagnostic/audit logging of which config produced a given run.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its content hash.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn defaults_apply_when_every_section_is_absent() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pool.max_workers, 50);
        assert_eq!(config.planner.days, 33);
        assert_eq!(config.delay.max_load, 20);
    }

    #[test]
    fn load_valid_config_overrides_only_named_fields() {
        let config_content = r#"
[pool]
max-workers = 10
overall-timeout-secs = 3600

[delay]
max-load = 15

[planner]
days = 14

[user-agent]
crawler-name = "TestScraper"

[client]
timeout-secs = 30
use-proxy = true
proxy-url = "http://proxy.example.com:8080"
"#;
        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.pool.max_workers, 10);
        assert_eq!(config.pool.overall_timeout_secs, 3600);
        assert_eq!(config.delay.max_load, 15);
        assert_eq!(config.planner.days, 14);
        assert_eq!(config.user_agent.crawler_name, "TestScraper");
        assert!(config.client.use_proxy);
        assert_eq!(config.client.proxy_url.as_deref(), Some("http://proxy.example.com:8080"));
    }

    #[test]
    fn load_config_with_invalid_path_errors() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_with_invalid_toml_errors() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_config_with_validation_error() {
        let config_content = r#"
[delay]
max-load = 0
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn compute_config_hash_is_stable_and_content_sensitive() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1a = compute_config_hash(file1.path()).unwrap();
        let hash1b = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_eq!(hash1a, hash1b);
        assert_eq!(hash1a.len(), 64);
        assert_ne!(hash1a, hash2);
    }
}
