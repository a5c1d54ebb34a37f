//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, addresses parse)
//! - Check codec references (active key exists, ids unique)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShieldConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ShieldConfig, TokenFormat};

/// One year.
pub const MAX_BLOCKED_DURATION_MINS: u64 = 365 * 24 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("codec key id '{0}' is invalid (use letters, digits, '-' or '_')")]
    InvalidKeyId(String),

    #[error("codec key id '{0}' is declared more than once")]
    DuplicateKeyId(String),

    #[error("codec.active_key_id '{0}' does not name a configured key")]
    UnknownActiveKey(String),

    #[error("codec.format = \"legacy-cbc\" requires {0}")]
    MissingLegacySource(&'static str),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    let limits = &config.rate_limiting;
    if limits.enabled {
        if limits.max_requests == 0 {
            errors.push(ValidationError::Zero("rate_limiting.max_requests"));
        }
        if limits.window_duration_secs == 0 {
            errors.push(ValidationError::Zero("rate_limiting.window_duration_secs"));
        }
        if limits.sweep_interval_secs == 0 {
            errors.push(ValidationError::Zero("rate_limiting.sweep_interval_secs"));
        }
        if limits.blocked_duration_mins > MAX_BLOCKED_DURATION_MINS {
            errors.push(ValidationError::TooLarge {
                field: "rate_limiting.blocked_duration_mins",
                max: MAX_BLOCKED_DURATION_MINS,
            });
        }
    }

    if config.payload.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("payload.max_body_bytes"));
    }

    let codec = &config.codec;
    let mut seen = HashSet::new();
    for key in &codec.keys {
        if !is_valid_key_id(&key.id) {
            errors.push(ValidationError::InvalidKeyId(key.id.clone()));
        }
        if !seen.insert(key.id.as_str()) {
            errors.push(ValidationError::DuplicateKeyId(key.id.clone()));
        }
    }

    match codec.format {
        TokenFormat::AeadV1 => {
            if !seen.contains(codec.active_key_id.as_str()) {
                errors.push(ValidationError::UnknownActiveKey(codec.active_key_id.clone()));
            }
        }
        TokenFormat::LegacyCbc => {
            if codec.legacy_key_env.is_none() {
                errors.push(ValidationError::MissingLegacySource("codec.legacy_key_env"));
            }
            if codec.legacy_iv_env.is_none() {
                errors.push(ValidationError::MissingLegacySource("codec.legacy_iv_env"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Key ids travel inside tokens, so they stay within a small alphabet.
pub fn is_valid_key_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
