//! Request decoding.
//!
//! # Responsibilities
//! - Build an [`IncomingRequest`] from the transport request
//! - Decode the body per content type (JSON or form-encoded)
//! - Parse query parameters
//! - Carry request-scoped extensions set by middleware
//!
//! # Design Decisions
//! - A malformed JSON body is not rejected here; it surfaces as a 400 only
//!   when the handler asks for the body
//! - Repeated query/form keys keep the last value

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::dispatcher::GatewayContext;
use crate::http::response::ApiError;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(HashMap<String, String>),
    /// The body claimed to be JSON but failed to parse.
    Invalid(String),
}

/// One HTTP call, as seen by middleware and handlers.
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: Method,
    /// Path exactly as received.
    pub raw_path: String,
    /// Path with the mount prefix stripped; set by the dispatcher.
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub request_id: Option<String>,
    pub extensions: Extensions,
}

impl IncomingRequest {
    /// Build a request with no headers and no body. `target` may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_urlencoded(query.as_bytes())),
            None => (target, HashMap::new()),
        };
        Self {
            method,
            raw_path: path.to_string(),
            path: path.to_string(),
            query,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            request_id: None,
            extensions: Extensions::new(),
        }
    }

    /// Collect and decode an axum request. Bodies over `max_body_size` are rejected.
    pub async fn from_http(req: Request<Body>, max_body_size: usize) -> Result<Self, ApiError> {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(body_error)?;

        let path = parts.uri.path().to_string();
        let query = parts
            .uri
            .query()
            .map(|q| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = decode_body(&parts.headers, &bytes);

        Ok(Self {
            method: parts.method,
            raw_path: path.clone(),
            path,
            query,
            headers: parts.headers,
            body,
            request_id,
            extensions: parts.extensions,
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_json(mut self, value: Value) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = RequestBody::Json(value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Deserialize the body. Form bodies are deserialized from their string map.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let value = match &self.body {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Form(map) => serde_json::to_value(map)
                .map_err(|e| ApiError::BadRequest(format!("invalid form body: {e}")))?,
            RequestBody::Empty => return Err(ApiError::BadRequest("request body is required".into())),
            RequestBody::Invalid(msg) => {
                return Err(ApiError::BadRequest(format!("malformed JSON body: {msg}")))
            }
        };
        serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))
    }

    /// Process-wide context installed by the dispatcher.
    pub fn context(&self) -> Option<&GatewayContext> {
        self.extensions.get::<GatewayContext>()
    }
}

/// Only an exceeded limit is a 413; a body that breaks off mid-stream is a 400.
fn body_error(err: axum::Error) -> ApiError {
    let inner = err.into_inner();
    let over_limit = std::iter::successors(
        Some(inner.as_ref() as &(dyn std::error::Error + 'static)),
        |e| e.source(),
    )
    .any(|e| e.is::<LengthLimitError>());

    if over_limit {
        ApiError::PayloadTooLarge
    } else {
        tracing::debug!(error = %inner, "Failed to read request body");
        ApiError::BadRequest("failed to read request body".into())
    }
}

fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> RequestBody {
    if bytes.is_empty() {
        return RequestBody::Empty;
    }
    if is_json_content_type(headers) {
        match serde_json::from_slice(bytes) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => RequestBody::Invalid(e.to_string()),
        }
    } else {
        RequestBody::Form(parse_urlencoded(bytes))
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

fn parse_urlencoded(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}
