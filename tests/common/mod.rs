//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{Map, Value};
use tower::ServiceExt;

use crm_gateway::config::GatewayConfig;
use crm_gateway::http::{
    Dispatcher, HttpServer, IncomingRequest, Middleware, MiddlewareOutcome, ResponseDraft,
};
use crm_gateway::routing::{RouteParams, RouteTable};
use crm_gateway::{ApiError, HandlerRef, HandlerResult};

/// A response read fully into memory.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).expect("response body is UTF-8")
    }
}

/// Build an in-process app with default config and no middleware.
pub fn app(table: RouteTable) -> Router {
    app_with(GatewayConfig::default(), table, |_| {})
}

/// Build an in-process app; `install` registers middleware on the dispatcher.
pub fn app_with(
    config: GatewayConfig,
    table: RouteTable,
    install: impl FnOnce(&mut Dispatcher),
) -> Router {
    let config = Arc::new(config);
    let mut dispatcher = Dispatcher::new(table, Arc::clone(&config));
    install(&mut dispatcher);
    HttpServer::new(config, dispatcher).router()
}

/// Send one request through `router`.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Handler that returns a fixed tag and the extracted parameters.
pub fn tagged(tag: &'static str, calls: Arc<AtomicUsize>) -> HandlerRef {
    HandlerRef::new(tag, move |_req: IncomingRequest, params: RouteParams| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(HandlerResult::ok(serde_json::json!({
                "handler": tag,
                "params": params_map(&params),
            })))
        }
    })
}

pub fn params_map(params: &RouteParams) -> Value {
    let map: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    Value::Object(map)
}

/// Middleware stub that counts invocations and returns a fixed outcome.
///
/// When `writes` is set, it replaces the response draft before returning.
pub struct CountingMiddleware {
    pub calls: Arc<AtomicUsize>,
    pub outcome: MiddlewareOutcome,
    pub writes: Option<ResponseDraft>,
}

impl CountingMiddleware {
    pub fn passing(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            outcome: MiddlewareOutcome::Continue,
            writes: None,
        }
    }

    pub fn rejecting(calls: Arc<AtomicUsize>, result: HandlerResult) -> Self {
        Self {
            calls,
            outcome: MiddlewareOutcome::Respond(result),
            writes: None,
        }
    }

    /// Writes `draft` into the response and halts.
    pub fn halting(calls: Arc<AtomicUsize>, draft: ResponseDraft) -> Self {
        Self {
            calls,
            outcome: MiddlewareOutcome::Halt,
            writes: Some(draft),
        }
    }
}

impl Middleware for CountingMiddleware {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn handle(&self, _req: &mut IncomingRequest, res: &mut ResponseDraft) -> MiddlewareOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(draft) = &self.writes {
            *res = draft.clone();
        }
        self.outcome.clone()
    }
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
