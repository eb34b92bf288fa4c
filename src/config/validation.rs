use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, TargetConfig, UserAgentConfig,
};
use crate::url::listing_url;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawler_config(&config.crawler)?;
    validate_selectors(&config.selectors)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the listing target
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    validate_partition(&config.partition)?;

    let url = listing_url(&config.listing_url, &config.partition, config.start_page)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-url: {}", e)))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "listing-url '{}' has no host",
            config.listing_url
        )));
    }

    Ok(())
}

/// Partition names end up in file names, so keep them path-safe
fn validate_partition(partition: &str) -> Result<(), ConfigError> {
    if partition.is_empty() {
        return Err(ConfigError::Validation(
            "partition cannot be empty".to_string(),
        ));
    }

    if !partition
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "partition must contain only ASCII alphanumerics, '-' and '_', got '{}'",
            partition
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency_limit < 1 || config.concurrency_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency_limit must be between 1 and 100, got {}",
            config.concurrency_limit
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.retry_delay_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "retry_delay_ms must be >= 10ms, got {}ms",
            config.retry_delay_ms
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks both selectors compile
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("listing-item", &config.listing_item),
        ("homepage-link", &config.homepage_link),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e))
        })?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain a single @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
