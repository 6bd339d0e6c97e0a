//! Typed handler references.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::request::IncomingRequest;
use crate::http::response::{ApiError, HandlerResult, IntoHandlerResult};
use crate::routing::RouteParams;

/// Future returned by a type-erased handler.
pub type HandlerFuture = BoxFuture<'static, Result<HandlerResult, ApiError>>;

/// A request handler bound to a route.
///
/// Implemented for any `Fn(IncomingRequest, RouteParams) -> impl Future<Output =
/// Result<R, ApiError>>` where `R` converts into a [`HandlerResult`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: IncomingRequest, params: RouteParams) -> HandlerFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(IncomingRequest, RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: IntoHandlerResult,
{
    fn call(&self, req: IncomingRequest, params: RouteParams) -> HandlerFuture {
        let fut = (self)(req, params);
        Box::pin(async move { fut.await.and_then(IntoHandlerResult::into_handler_result) })
    }
}

/// A named, already-resolved handler.
///
/// The name follows the `Controller::action` convention and shows up in logs,
/// metrics and the route listing.
#[derive(Clone)]
pub struct HandlerRef {
    name: Arc<str>,
    handler: Arc<dyn Handler>,
}

impl HandlerRef {
    pub fn new(name: impl Into<Arc<str>>, handler: impl Handler) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, req: IncomingRequest, params: RouteParams) -> HandlerFuture {
        self.handler.call(req, params)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRef").field(&self.name).finish()
    }
}
