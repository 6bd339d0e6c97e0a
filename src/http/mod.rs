//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, split query, parse JSON/form)
//!     → dispatcher.rs
//!         OPTIONS → 200 empty
//!         strip mount prefix → route table lookup (first match wins)
//!         → middleware.rs chain (skipped for public routes)
//!         → handler.rs (timeout + panic guard)
//!     → response.rs (status + JSON body)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{Dispatcher, GatewayContext, MountPrefixes};
pub use handler::{Handler, HandlerFuture, HandlerRef};
pub use middleware::{Middleware, MiddlewareKind, MiddlewareOutcome, ResponseDraft};
pub use request::{IncomingRequest, RequestBody, X_REQUEST_ID};
pub use response::{error_body, ApiError, HandlerResult, IntoHandlerResult};
pub use server::{HttpServer, ServerError};
