//! Request dispatch.
//!
//! # Responsibilities
//! - Strip the deployment mount prefix from the inbound path
//! - Answer pre-flight OPTIONS requests before routing
//! - Resolve the first matching route or answer 404
//! - Run the middleware chain unless the route opts out
//! - Invoke the handler under a deadline and capture faults
//! - Serialize the result as JSON
//!
//! # Design Decisions
//! - Holds only immutable state; shared behind `Arc` across requests
//! - Handler panics become a generic 500, details go to the log
//! - Handlers that overrun `timeouts.handler_secs` become a 504

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{Method as HttpMethod, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;

use crate::config::{GatewayConfig, SkipAuthScope};
use crate::http::middleware::{Middleware, MiddlewareKind, MiddlewareOutcome, ResponseDraft};
use crate::http::request::IncomingRequest;
use crate::http::response::{empty_ok, ApiError, HandlerResult};
use crate::observability::metrics;
use crate::routing::{Method, Route, RouteParams, RouteTable};

/// Process-wide context handed to handlers through request extensions.
#[derive(Clone, Debug)]
pub struct GatewayContext {
    pub config: Arc<GatewayConfig>,
    pub routes: Arc<RouteTable>,
}

/// Ordered list of mount prefixes to strip from inbound paths.
#[derive(Debug, Clone, Default)]
pub struct MountPrefixes {
    prefixes: Vec<String>,
}

impl MountPrefixes {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Strip the first prefix that matches at a segment boundary.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        for prefix in &self.prefixes {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                if rest.is_empty() {
                    return "/";
                }
                if rest.starts_with('/') {
                    return rest;
                }
            }
        }
        path
    }
}

/// Resolves requests to routes and runs them.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    middleware: Vec<Arc<dyn Middleware>>,
    prefixes: MountPrefixes,
    skip_auth_scope: SkipAuthScope,
    handler_timeout: Duration,
    context: GatewayContext,
}

impl Dispatcher {
    /// Freeze the route table and read dispatch settings from config.
    pub fn new(routes: RouteTable, config: Arc<GatewayConfig>) -> Self {
        let routes = Arc::new(routes);
        Self {
            prefixes: MountPrefixes::new(config.routing.mount_prefixes.iter().cloned()),
            skip_auth_scope: config.routing.skip_auth_scope,
            handler_timeout: Duration::from_secs(config.timeouts.handler_secs),
            context: GatewayContext {
                config,
                routes: Arc::clone(&routes),
            },
            routes,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. Chain order is registration order.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        tracing::debug!(middleware = middleware.name(), "Middleware registered");
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Run one request through normalization, routing, middleware and handler.
    pub async fn dispatch(&self, mut req: IncomingRequest) -> Response {
        let start = Instant::now();
        let method_label = metrics_method_label(&req.method);

        if req.method == HttpMethod::OPTIONS {
            return empty_ok();
        }

        req.path = self.prefixes.strip(&req.raw_path).to_string();
        let request_id = req.request_id.clone().unwrap_or_else(|| "unknown".to_string());

        let matched = Method::from_http(&req.method)
            .and_then(|method| self.routes.find(method, &req.path));
        let (route, params) = match matched {
            Some(found) => found,
            None => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %req.method,
                    path = %req.raw_path,
                    "No route matched"
                );
                metrics::record_request(method_label, StatusCode::NOT_FOUND.as_u16(), "none", start);
                return ApiError::RouteNotFound.into_response();
            }
        };

        tracing::debug!(
            request_id = %request_id,
            method = %req.method,
            path = %req.path,
            route = %route.path(),
            handler = %route.handler.name(),
            "Route matched"
        );

        let mut draft = ResponseDraft::default();
        for middleware in &self.middleware {
            if !self.applies(route, middleware.as_ref()) {
                continue;
            }
            match middleware.handle(&mut req, &mut draft) {
                MiddlewareOutcome::Continue => {}
                outcome => {
                    let response = match outcome {
                        MiddlewareOutcome::Respond(result) => result.into_http(draft.headers),
                        _ => draft.into_http(),
                    };
                    tracing::info!(
                        request_id = %request_id,
                        middleware = middleware.name(),
                        status = response.status().as_u16(),
                        "Request rejected by middleware"
                    );
                    metrics::record_rejection(middleware.name());
                    metrics::record_request(method_label, response.status().as_u16(), route.path(), start);
                    return response;
                }
            }
        }

        req.extensions.insert(self.context.clone());

        let result = match self.invoke(route, req, params).await {
            Ok(result) => result,
            Err(err) => {
                match &err {
                    ApiError::Internal(detail) => tracing::error!(
                        request_id = %request_id,
                        handler = %route.handler.name(),
                        error = %detail,
                        "Handler failed"
                    ),
                    ApiError::Timeout => tracing::warn!(
                        request_id = %request_id,
                        handler = %route.handler.name(),
                        timeout = ?self.handler_timeout,
                        "Handler timed out"
                    ),
                    other => tracing::debug!(
                        request_id = %request_id,
                        handler = %route.handler.name(),
                        error = %other,
                        "Handler returned error"
                    ),
                }
                err.to_result()
            }
        };

        metrics::record_request(method_label, result.status.as_u16(), route.path(), start);
        result.into_http(draft.headers)
    }

    fn applies(&self, route: &Route, middleware: &dyn Middleware) -> bool {
        if !route.options.skip_auth {
            return true;
        }
        match self.skip_auth_scope {
            SkipAuthScope::AllMiddleware => false,
            SkipAuthScope::AuthenticationOnly => middleware.kind() != MiddlewareKind::Authentication,
        }
    }

    async fn invoke(
        &self,
        route: &Route,
        req: IncomingRequest,
        params: RouteParams,
    ) -> Result<HandlerResult, ApiError> {
        let handler = route.handler.clone();
        // The call happens inside the future so synchronous panics are caught too.
        let call = AssertUnwindSafe(async move { handler.call(req, params).await }).catch_unwind();

        match tokio::time::timeout(self.handler_timeout, call).await {
            Err(_) => Err(ApiError::Timeout),
            Ok(Err(payload)) => Err(ApiError::Internal(format!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

/// Bounded metrics label for a transport method. Anything a route cannot
/// carry is folded into `OTHER`.
fn metrics_method_label(method: &HttpMethod) -> &'static str {
    Method::from_http(method).map_or("OTHER", |m| m.as_str())
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
