//! Configuration validation.
//!
//! Semantic checks only; serde covers the syntactic layer. The validator
//! is a pure function over `MeshConfig` and reports every problem it
//! finds, not just the first.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::MeshConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("peer table is empty")]
    EmptyPeerTable,

    #[error("duplicate peer port {0}")]
    DuplicatePort(u16),

    #[error("greeting.call_timeout_ms must be greater than zero")]
    ZeroCallTimeout,

    #[error("greeting.max_attempts must be greater than zero")]
    ZeroAttempts,

    #[error(
        "greeting.overall_deadline_ms ({deadline_ms}) is shorter than a single call timeout ({timeout_ms})"
    )]
    DeadlineShorterThanCall { deadline_ms: u64, timeout_ms: u64 },

    #[error("shutdown.grace_secs must be greater than zero")]
    ZeroGrace,
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &MeshConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.peers.ports.is_empty() {
        errors.push(ValidationError::EmptyPeerTable);
    }
    let mut seen = HashSet::new();
    for port in &config.peers.ports {
        if !seen.insert(*port) {
            errors.push(ValidationError::DuplicatePort(*port));
        }
    }

    if config.greeting.call_timeout_ms == 0 {
        errors.push(ValidationError::ZeroCallTimeout);
    }
    if config.greeting.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if config.greeting.overall_deadline_ms < config.greeting.call_timeout_ms {
        errors.push(ValidationError::DeadlineShorterThanCall {
            deadline_ms: config.greeting.overall_deadline_ms,
            timeout_ms: config.greeting.call_timeout_ms,
        });
    }

    if config.shutdown.grace_secs == 0 {
        errors.push(ValidationError::ZeroGrace);
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

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MeshConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = MeshConfig::default();
        config.peers.ports = vec![4001, 4001];
        config.greeting.max_attempts = 0;
        config.shutdown.grace_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicatePort(4001)));
        assert!(errors.contains(&ValidationError::ZeroAttempts));
        assert!(errors.contains(&ValidationError::ZeroGrace));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_table_rejected() {
        let mut config = MeshConfig::default();
        config.peers.ports.clear();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyPeerTable]);
    }

    #[test]
    fn deadline_must_cover_one_call() {
        let mut config = MeshConfig::default();
        config.greeting.call_timeout_ms = 2_000;
        config.greeting.overall_deadline_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DeadlineShorterThanCall {
                deadline_ms: 1_000,
                timeout_ms: 2_000,
            }]
        );
    }
}
