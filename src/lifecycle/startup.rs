//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble the route table from code, config and system routes
//! - Install the middleware chain in its fixed order
//! - Freeze everything into a `Dispatcher`
//!
//! # Design Decisions
//! - Fail fast: an unknown handler or bad pattern is a startup error
//! - Route order: application routes, then config routes, then system routes
//! - Middleware order: authentication, rate limiting, security headers

use std::sync::Arc;

use crate::admin;
use crate::config::GatewayConfig;
use crate::http::Dispatcher;
use crate::routing::{HandlerRegistry, RouteError, RouteTable};
use crate::security::{ApiKeyAuth, RateLimiter, SecurityHeaders};

/// Build the dispatcher for `config`.
///
/// `table` holds routes registered in code; `registry` resolves handler names
/// used by config-declared routes (system handlers are always resolvable).
pub fn build_dispatcher(
    config: Arc<GatewayConfig>,
    mut table: RouteTable,
    registry: &HandlerRegistry,
) -> Result<Dispatcher, RouteError> {
    let mut handlers = admin::system_handlers();
    for name in config.routes.iter().map(|r| r.handler.as_str()) {
        if let Some(handler) = registry.resolve(name) {
            handlers.insert(handler);
        }
    }

    table.extend_from_config(&config.routes, &handlers)?;
    admin::register_system_routes(&mut table)?;

    let mut dispatcher = Dispatcher::new(table, Arc::clone(&config));
    if let Some(auth) = ApiKeyAuth::from_config(&config.auth) {
        dispatcher.use_middleware(auth);
    }
    if let Some(limiter) = RateLimiter::from_config(&config.rate_limit) {
        dispatcher.use_middleware(limiter);
    }
    if config.security.enable_headers {
        dispatcher.use_middleware(SecurityHeaders);
    }

    tracing::info!(
        routes = dispatcher.routes().len(),
        middleware = ?dispatcher.middleware_names(),
        "Dispatcher ready"
    );

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeyConfig, RouteConfig};
    use crate::http::{ApiError, HandlerRef, IncomingRequest};
    use crate::routing::{Method, RouteParams};
    use serde_json::json;

    #[test]
    fn test_middleware_order_and_system_routes() {
        let mut config = GatewayConfig::default();
        config.auth.enabled = true;
        config.auth.api_keys.push(ApiKeyConfig {
            id: "a".into(),
            key: "k".into(),
        });
        config.rate_limit.enabled = true;

        let dispatcher =
            build_dispatcher(Arc::new(config), RouteTable::new(), &HandlerRegistry::new()).unwrap();
        assert_eq!(
            dispatcher.middleware_names(),
            vec!["auth", "rate_limit", "security_headers"]
        );
        let (route, _) = dispatcher.routes().find(Method::Get, "/health").unwrap();
        assert!(route.options.skip_auth);
    }

    #[test]
    fn test_config_routes_bind_registry_handlers() {
        let mut registry = HandlerRegistry::new();
        registry.insert(HandlerRef::new(
            "Leads::show",
            |_req: IncomingRequest, params: RouteParams| async move {
                Ok::<_, ApiError>(json!({ "id": params.get("id") }))
            },
        ));
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            method: "GET".into(),
            path: "/leads/{id}".into(),
            handler: "Leads::show".into(),
            skip_auth: false,
        });
        config.routes.push(RouteConfig {
            method: "GET".into(),
            path: "/ping".into(),
            handler: "System::health".into(),
            skip_auth: true,
        });

        let dispatcher = build_dispatcher(Arc::new(config), RouteTable::new(), &registry).unwrap();
        let (route, _) = dispatcher.routes().find(Method::Get, "/leads/3").unwrap();
        assert_eq!(route.handler.name(), "Leads::show");
        let (route, _) = dispatcher.routes().find(Method::Get, "/ping").unwrap();
        assert_eq!(route.handler.name(), "System::health");
    }

    #[test]
    fn test_unknown_handler_fails_startup() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            method: "GET".into(),
            path: "/leads".into(),
            handler: "Leads::index".into(),
            skip_auth: false,
        });
        let err = build_dispatcher(Arc::new(config), RouteTable::new(), &HandlerRegistry::new())
            .err()
            .unwrap();
        assert!(matches!(err, RouteError::UnknownHandler { .. }));
    }
}
