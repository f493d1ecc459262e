use crate::config::types::{ApiConfig, Config, CrawlerConfig, OutputConfig, SearchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    non_empty("user-agent", &config.user_agent)?;

    if config.cooldown_secs < 1 {
        return Err(ConfigError::Validation(
            "cooldown-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates search-space configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    non_empty("signature", &config.signature)?;
    non_empty("filename", &config.filename)?;
    non_empty("fallback-qualifier", &config.fallback_qualifier)?;

    if config.domain_from < 0 {
        return Err(ConfigError::Validation(format!(
            "domain-from must be >= 0, got {}",
            config.domain_from
        )));
    }

    if config.domain_from > config.domain_to {
        return Err(ConfigError::Validation(format!(
            "domain-from ({}) must not exceed domain-to ({})",
            config.domain_from, config.domain_to
        )));
    }

    if config.per_page < 1 || config.per_page > 100 {
        return Err(ConfigError::Validation(format!(
            "per-page must be between 1 and 100, got {}",
            config.per_page
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.result_cap < u64::from(config.per_page) {
        return Err(ConfigError::Validation(format!(
            "result-cap ({}) must be at least per-page ({})",
            config.result_cap, config.per_page
        )));
    }

    Ok(())
}

/// Validates per-repository crawl configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    non_empty("source-extension", &config.source_extension)?;

    if config.source_extension.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "source-extension must not start with '.', got '{}'",
            config.source_extension
        )));
    }

    if let Some(path) = &config.stopwords_path {
        non_empty("stopwords-path", path)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    non_empty("database-path", &config.database_path)
}

fn non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}
