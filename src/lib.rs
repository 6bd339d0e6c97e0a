//! CRM API gateway library.
//!
//! A route table, path matcher and dispatcher in front of named handlers,
//! with API-key auth, per-client rate limiting and a uniform JSON error body.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Built-in endpoints
pub mod admin;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use http::{ApiError, Dispatcher, HandlerRef, HandlerResult, HttpServer, IncomingRequest};
pub use lifecycle::{build_dispatcher, Shutdown};
pub use routing::{HandlerRegistry, Method, RouteOptions, RouteParams, RouteTable};
