//! Security response headers.

use axum::http::header::{CACHE_CONTROL, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderName, HeaderValue};

use crate::http::middleware::{Middleware, MiddlewareKind, MiddlewareOutcome, ResponseDraft};
use crate::http::request::IncomingRequest;

const HEADERS: [(HeaderName, &str); 4] = [
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "DENY"),
    (REFERRER_POLICY, "no-referrer"),
    (CACHE_CONTROL, "no-store"),
];

/// Writes hardening headers into every response that passes through the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl Middleware for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::Headers
    }

    fn handle(&self, _req: &mut IncomingRequest, res: &mut ResponseDraft) -> MiddlewareOutcome {
        for (name, value) in HEADERS {
            res.headers.insert(name, HeaderValue::from_static(value));
        }
        MiddlewareOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_headers_written_to_draft() {
        let mut draft = ResponseDraft::default();
        let outcome = SecurityHeaders.handle(&mut IncomingRequest::new(Method::GET, "/"), &mut draft);
        assert_eq!(outcome, MiddlewareOutcome::Continue);
        assert_eq!(draft.headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(draft.headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(draft.headers.len(), 4);
    }
}
