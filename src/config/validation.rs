//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check mount prefixes and declared routes are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::{compile, Method};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than 0")]
    MaxConnections,

    #[error("mount prefix `{prefix}` {reason}")]
    MountPrefix { prefix: String, reason: &'static str },

    #[error("routes[{index}]: {reason}")]
    Route { index: usize, reason: String },

    #[error("timeouts.{0} must be greater than 0")]
    Timeout(&'static str),

    #[error("auth is enabled but no api_keys are configured")]
    NoApiKeys,

    #[error("auth.api_keys[{0}] has an empty id or key")]
    EmptyApiKey(usize),

    #[error("rate_limit.{0} must be greater than 0 when rate limiting is enabled")]
    RateLimit(&'static str),

    #[error("security.max_body_size must be greater than 0")]
    MaxBodySize,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }

    for prefix in &config.routing.mount_prefixes {
        let reason = if !prefix.starts_with('/') {
            Some("must start with '/'")
        } else if prefix.len() > 1 && prefix.ends_with('/') {
            Some("must not end with '/'")
        } else if prefix == "/" {
            Some("must not be the root path")
        } else {
            None
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::MountPrefix {
                prefix: prefix.clone(),
                reason,
            });
        }
    }

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(e) = route.method.parse::<Method>() {
            errors.push(ValidationError::Route {
                index,
                reason: e.to_string(),
            });
        }
        if let Err(e) = compile(&route.path) {
            errors.push(ValidationError::Route {
                index,
                reason: e.to_string(),
            });
        }
        if route.handler.trim().is_empty() {
            errors.push(ValidationError::Route {
                index,
                reason: "handler name is empty".to_string(),
            });
        }
    }

    if config.timeouts.handler_secs == 0 {
        errors.push(ValidationError::Timeout("handler_secs"));
    }

    if config.auth.enabled && config.auth.api_keys.is_empty() {
        errors.push(ValidationError::NoApiKeys);
    }
    for (index, key) in config.auth.api_keys.iter().enumerate() {
        if key.id.is_empty() || key.key.is_empty() {
            errors.push(ValidationError::EmptyApiKey(index));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::RateLimit("requests_per_second"));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::RateLimit("burst_size"));
        }
        if config.rate_limit.max_clients == 0 {
            errors.push(ValidationError::RateLimit("max_clients"));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
