//! Configuration validation.
//!
//! Serde handles syntax; this checks the semantic rules the dispatcher
//! relies on. All errors are collected, not just the first.

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    SiteCount(usize),
    InvalidPrefix { site: String, prefix: String },
    DuplicatePrefix(String),
    DuplicateName(String),
    ZeroPollInterval,
    EmptyRuntime,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::SiteCount(n) => write!(f, "expected exactly 2 sites, found {}", n),
            ValidationError::InvalidPrefix { site, prefix } => {
                write!(f, "site '{}' prefix '{}' must start and end with '/'", site, prefix)
            }
            ValidationError::DuplicatePrefix(p) => {
                write!(f, "prefix '{}' used by more than one site", p)
            }
            ValidationError::DuplicateName(n) => write!(f, "site name '{}' used more than once", n),
            ValidationError::ZeroPollInterval => {
                write!(f, "dev.poll_interval_ms must be greater than 0")
            }
            ValidationError::EmptyRuntime => write!(f, "runtime.program must not be empty"),
        }
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.sites.len() != 2 {
        errors.push(ValidationError::SiteCount(config.sites.len()));
    }

    let mut prefixes = HashSet::new();
    let mut names = HashSet::new();
    for site in &config.sites {
        let p = &site.prefix;
        if p.len() < 2 || !p.starts_with('/') || !p.ends_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                site: site.name.clone(),
                prefix: p.clone(),
            });
        }
        if !prefixes.insert(p.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(p.clone()));
        }
        if !names.insert(site.name.as_str()) {
            errors.push(ValidationError::DuplicateName(site.name.clone()));
        }
    }

    if config.dev.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.runtime.program.trim().is_empty() {
        errors.push(ValidationError::EmptyRuntime);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SiteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.sites = vec![
            SiteConfig::new("a", "test", "a"),
            SiteConfig::new("a", "test", "b"),
            SiteConfig::new("c", "/c/", "c"),
        ];
        config.dev.poll_interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::SiteCount(3)));
        assert!(errors.contains(&ValidationError::DuplicatePrefix("test".into())));
        assert!(errors.contains(&ValidationError::DuplicateName("a".into())));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidPrefix { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_root_prefix_rejected() {
        let mut config = ServerConfig::default();
        config.sites[0].prefix = "/".into();
        assert!(validate_config(&config).is_err());
    }
}
