//! API key authentication middleware.

use axum::http::header::AUTHORIZATION;

use crate::config::{ApiKeyConfig, AuthConfig};
use crate::http::middleware::{Middleware, MiddlewareKind, MiddlewareOutcome, ResponseDraft};
use crate::http::request::IncomingRequest;
use crate::http::response::ApiError;

/// Header accepted as an alternative to `Authorization: Bearer`.
pub const X_API_KEY: &str = "x-api-key";

/// Identity attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub key_id: String,
}

/// Accepts `Authorization: Bearer <key>` or `X-Api-Key: <key>`.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    keys: Vec<ApiKeyConfig>,
}

impl ApiKeyAuth {
    pub fn new(keys: Vec<ApiKeyConfig>) -> Self {
        Self { keys }
    }

    /// `None` when auth is disabled.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.api_keys.clone()))
    }

    fn presented_key(req: &IncomingRequest) -> Option<&str> {
        req.header(AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .or_else(|| req.header(X_API_KEY))
            .map(str::trim)
    }
}

impl Middleware for ApiKeyAuth {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::Authentication
    }

    fn handle(&self, req: &mut IncomingRequest, _res: &mut ResponseDraft) -> MiddlewareOutcome {
        let matched = Self::presented_key(req)
            .and_then(|presented| self.keys.iter().find(|k| k.key == presented));

        match matched {
            Some(key) => {
                req.extensions.insert(Principal {
                    key_id: key.id.clone(),
                });
                MiddlewareOutcome::Continue
            }
            None => MiddlewareOutcome::Respond(ApiError::Unauthorized.to_result()),
        }
    }
}
