//! Pre-handler middleware chain.
//!
//! Each middleware inspects the request and either lets it through or ends it.
//! The chain runs strictly in registration order and stops at the first step
//! that does not return [`MiddlewareOutcome::Continue`].

use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::http::request::IncomingRequest;
use crate::http::response::{json_response, HandlerResult};

/// What a middleware step decided.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareOutcome {
    /// Run the next step (or the handler).
    Continue,
    /// Stop and send this result.
    Respond(HandlerResult),
    /// Stop and send whatever the step already wrote to the [`ResponseDraft`].
    Halt,
}

/// Which concern a middleware covers. Used to scope `skip_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareKind {
    Authentication,
    RateLimit,
    Headers,
    Other,
}

/// The response under construction.
///
/// Headers written here are merged into the final response whether it comes
/// from the handler or from a short-circuit.
#[derive(Debug, Clone)]
pub struct ResponseDraft {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Default for ResponseDraft {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl ResponseDraft {
    pub(crate) fn into_http(self) -> axum::response::Response {
        json_response(self.status, self.body.as_ref(), self.headers)
    }
}

/// A step that runs before the handler.
pub trait Middleware: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::Other
    }

    fn handle(&self, req: &mut IncomingRequest, res: &mut ResponseDraft) -> MiddlewareOutcome;
}
