//! Route table and registration.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Resolve method + path to the first matching route
//! - Bind config-declared routes against a typed handler registry
//!
//! # Design Decisions
//! - Append-only during startup, frozen behind `Arc` afterwards
//! - No deduplication or conflict detection: first match wins, later
//!   overlapping routes are unreachable
//! - Handlers are resolved when a route is registered, never at dispatch time

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RouteConfig;
use crate::http::handler::HandlerRef;
use crate::routing::matcher::{compile, CompiledPattern, PatternError, RouteParams};

/// HTTP methods a route can be registered for.
///
/// OPTIONS is answered by the dispatcher before routing and cannot be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Map a transport method; `None` for methods no route can carry.
    ///
    /// Method tokens are case-sensitive on the wire, so an extension method
    /// spelled `get` is not GET. Config parsing goes through `FromStr` instead.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match method.as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(RouteError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Per-route options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Bypass the authentication step. How much of the middleware chain this
    /// skips is governed by `routing.skip_auth_scope`.
    pub skip_auth: bool,
}

impl RouteOptions {
    pub fn public() -> Self {
        Self { skip_auth: true }
    }
}

/// Error raised while building the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    #[error("route `{method} {path}` references unknown handler `{handler}`")]
    UnknownHandler {
        method: String,
        path: String,
        handler: String,
    },
}

/// A registered route. Immutable once in the table.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: CompiledPattern,
    pub handler: HandlerRef,
    pub options: RouteOptions,
}

impl Route {
    pub fn path(&self) -> &str {
        self.pattern.source()
    }
}

/// Ordered list of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one route.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandlerRef,
        options: RouteOptions,
    ) -> Result<&mut Self, RouteError> {
        let compiled = compile(pattern)?;
        tracing::debug!(
            method = %method,
            path = %pattern,
            handler = %handler.name(),
            skip_auth = options.skip_auth,
            "Route registered"
        );
        self.routes.push(Route {
            method,
            pattern: compiled,
            handler,
            options,
        });
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, handler: HandlerRef) -> Result<&mut Self, RouteError> {
        self.register(Method::Get, pattern, handler, RouteOptions::default())
    }

    pub fn post(&mut self, pattern: &str, handler: HandlerRef) -> Result<&mut Self, RouteError> {
        self.register(Method::Post, pattern, handler, RouteOptions::default())
    }

    pub fn put(&mut self, pattern: &str, handler: HandlerRef) -> Result<&mut Self, RouteError> {
        self.register(Method::Put, pattern, handler, RouteOptions::default())
    }

    pub fn patch(&mut self, pattern: &str, handler: HandlerRef) -> Result<&mut Self, RouteError> {
        self.register(Method::Patch, pattern, handler, RouteOptions::default())
    }

    pub fn delete(&mut self, pattern: &str, handler: HandlerRef) -> Result<&mut Self, RouteError> {
        self.register(Method::Delete, pattern, handler, RouteOptions::default())
    }

    /// Register config-declared routes, resolving handler names against `registry`.
    pub fn extend_from_config(
        &mut self,
        routes: &[RouteConfig],
        registry: &HandlerRegistry,
    ) -> Result<(), RouteError> {
        for route in routes {
            let method: Method = route.method.parse()?;
            let handler = registry.resolve(&route.handler).ok_or_else(|| {
                RouteError::UnknownHandler {
                    method: route.method.clone(),
                    path: route.path.clone(),
                    handler: route.handler.clone(),
                }
            })?;
            self.register(
                method,
                &route.path,
                handler,
                RouteOptions {
                    skip_auth: route.skip_auth,
                },
            )?;
        }
        Ok(())
    }

    /// First route whose method and pattern both match.
    pub fn find(&self, method: Method, path: &str) -> Option<(&Route, RouteParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Named handlers that config-declared routes can bind to.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerRef>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under its own name. A later insert with the same name replaces it.
    pub fn insert(&mut self, handler: HandlerRef) -> &mut Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<HandlerRef> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
