//! Handler results and the JSON response envelope.
//!
//! # Responsibilities
//! - Carry a handler's status code and JSON body
//! - Coerce raw values into a 200 result
//! - Render every error as `{"error": "<message>"}`
//!
//! # Design Decisions
//! - One error envelope for the router, middleware and handlers alike
//! - Internal error details are logged, never sent to the client
//! - Every body is `application/json`; only the OPTIONS reply is empty

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// The outcome of a handler: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub status: StatusCode,
    pub body: Value,
}

impl HandlerResult {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// Serialize any value into a result with the given status.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_value(value)
            .map_err(|e| ApiError::Internal(format!("response serialization failed: {e}")))?;
        Ok(Self::new(status, body))
    }

    /// Render with the given extra headers (set by middleware).
    pub fn into_http(self, extra_headers: HeaderMap) -> Response {
        json_response(self.status, Some(&self.body), extra_headers)
    }
}

/// Conversion of handler return values into a [`HandlerResult`].
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> Result<HandlerResult, ApiError>;
}

impl IntoHandlerResult for HandlerResult {
    fn into_handler_result(self) -> Result<HandlerResult, ApiError> {
        Ok(self)
    }
}

impl IntoHandlerResult for Value {
    fn into_handler_result(self) -> Result<HandlerResult, ApiError> {
        Ok(HandlerResult::ok(self))
    }
}

impl<T: Serialize> IntoHandlerResult for Json<T> {
    fn into_handler_result(self) -> Result<HandlerResult, ApiError> {
        HandlerResult::json(StatusCode::OK, &self.0)
    }
}

impl IntoHandlerResult for (StatusCode, Value) {
    fn into_handler_result(self) -> Result<HandlerResult, ApiError> {
        Ok(HandlerResult::new(self.0, self.1))
    }
}

/// Errors that end a request with an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Route not found")]
    RouteNotFound,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Rate limit exceeded")]
    TooManyRequests,

    #[error("request timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message the client sees.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// This error as a handler result carrying the envelope.
    pub fn to_result(&self) -> HandlerResult {
        HandlerResult::new(self.status(), error_body(&self.public_message()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_result().into_http(HeaderMap::new())
    }
}

/// The error envelope.
pub fn error_body(message: &str) -> Value {
    json!({ "error": message })
}

/// Build a JSON response. `None` yields an empty JSON-typed body.
pub(crate) fn json_response(status: StatusCode, body: Option<&Value>, extra_headers: HeaderMap) -> Response {
    let bytes = match body {
        Some(value) => match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response body");
                return ApiError::Internal(e.to_string()).into_response();
            }
        },
        None => Vec::new(),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.extend(extra_headers);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// The bare 200 returned to pre-flight requests.
pub(crate) fn empty_ok() -> Response {
    json_response(StatusCode::OK, None, HeaderMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_coerced_to_200() {
        let result = json!({"id": "7"}).into_handler_result().unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!({"id": "7"}));
    }

    #[test]
    fn test_json_wrapper_coerced() {
        #[derive(Serialize)]
        struct Lead {
            id: u32,
        }
        let result = Json(Lead { id: 3 }).into_handler_result().unwrap();
        assert_eq!(result.body, json!({"id": 3}));
    }

    #[test]
    fn test_error_envelope() {
        let result = ApiError::RouteNotFound.to_result();
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(result.body, json!({"error": "Route not found"}));
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let err = ApiError::Internal("db password rejected".into());
        let result = err.to_result();
        assert_eq!(result.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.body, json!({"error": "internal error"}));
    }

    #[test]
    fn test_response_has_json_content_type() {
        let response = HandlerResult::created(json!({"ok": true})).into_http(HeaderMap::new());
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
