//! Built-in system endpoints.

pub mod handlers;

use crate::http::HandlerRef;
use crate::routing::{HandlerRegistry, Method, RouteError, RouteOptions, RouteTable};

pub const HEALTH: &str = "System::health";
pub const STATUS: &str = "System::status";
pub const ROUTES: &str = "System::routes";

/// The system handlers, by name, for config-declared routes.
pub fn system_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .insert(HandlerRef::new(HEALTH, handlers::health))
        .insert(HandlerRef::new(STATUS, handlers::status))
        .insert(HandlerRef::new(ROUTES, handlers::routes));
    registry
}

/// Register `/health` (public), `/status` and `/routes`.
pub fn register_system_routes(table: &mut RouteTable) -> Result<(), RouteError> {
    table
        .register(
            Method::Get,
            "/health",
            HandlerRef::new(HEALTH, handlers::health),
            RouteOptions::public(),
        )?
        .get("/status", HandlerRef::new(STATUS, handlers::status))?
        .get("/routes", HandlerRef::new(ROUTES, handlers::routes))?;
    Ok(())
}
