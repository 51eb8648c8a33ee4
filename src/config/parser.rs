use crate::config::types::Config;
use crate::config::validation::{validate, validate_seeds};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded on every run so a changed configuration shows up in
/// the run history.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Reads a seed list: one URL per line, blank lines and `#` comments ignored
///
/// Every entry must be an absolute http(s) URL.
pub fn load_seeds_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let seeds: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    validate_seeds(&seeds)?;

    Ok(seeds)
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

    const VALID_CONFIG: &str = r#"
seeds = ["https://example.com/"]

[crawler]
max-pages = 50
workers = 4
request-timeout-secs = 10

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[tracking]
utm-source = "audit"
utm-medium = "crawler"
utm-campaign = "2026-10"

[output]
database-path = "./test.db"
archive-dir = "./pages"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_pages, 50);
        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.crawler.canonical_scheme, "https");
        assert_eq!(config.crawler.max_duration_secs, None);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.tracking.utm_source, "audit");
        assert_eq!(config.tracking.utm_campaign.as_deref(), Some("2026-10"));
        assert_eq!(config.output.text_dir, "./data/text_pages");
        assert_eq!(config.seeds.len(), 1);
    }

    #[test]
    fn test_tracking_section_defaults() {
        let content = VALID_CONFIG.replace(
            "[tracking]\nutm-source = \"audit\"\nutm-medium = \"crawler\"\nutm-campaign = \"2026-10\"\n",
            "",
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.tracking.utm_source, "analyse");
        assert_eq!(config.tracking.utm_medium, "crawl_scrap");
        assert!(config.tracking.utm_campaign.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("max-pages = 50", "max-pages = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_load_seeds_file_skips_comments_and_blanks() {
        let file = create_temp_config(
            "# seeds\nhttps://example.com/\n\n   https://example.com/blog  \n# end\n",
        );
        let seeds = load_seeds_file(file.path()).unwrap();
        assert_eq!(
            seeds,
            vec![
                "https://example.com/".to_string(),
                "https://example.com/blog".to_string()
            ]
        );
    }

    #[test]
    fn test_load_seeds_file_rejects_bad_url() {
        let file = create_temp_config("https://example.com/\nftp://example.com/file\n");
        assert!(matches!(
            load_seeds_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_seeds_file_missing() {
        let result = load_seeds_file(Path::new("/nonexistent/seeds.txt"));
        assert!(result.is_err());
    }
}
