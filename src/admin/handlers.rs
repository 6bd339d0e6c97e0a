use serde::Serialize;
use serde_json::json;

use crate::http::{ApiError, HandlerResult, IncomingRequest};
use crate::routing::RouteParams;

#[derive(Serialize)]
pub struct SystemStatus {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RouteSummary {
    pub method: &'static str,
    pub path: String,
    pub handler: String,
    pub skip_auth: bool,
}

pub async fn health(_req: IncomingRequest, _params: RouteParams) -> Result<HandlerResult, ApiError> {
    Ok(HandlerResult::ok(json!({ "status": "ok" })))
}

pub async fn status(req: IncomingRequest, _params: RouteParams) -> Result<HandlerResult, ApiError> {
    let ctx = req
        .context()
        .ok_or_else(|| ApiError::Internal("gateway context not installed".into()))?;

    HandlerResult::json(
        axum::http::StatusCode::OK,
        &SystemStatus {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            status: "operational",
            routes: ctx.routes.len(),
        },
    )
}

pub async fn routes(req: IncomingRequest, _params: RouteParams) -> Result<HandlerResult, ApiError> {
    let ctx = req
        .context()
        .ok_or_else(|| ApiError::Internal("gateway context not installed".into()))?;

    let summaries: Vec<RouteSummary> = ctx
        .routes
        .routes()
        .iter()
        .map(|route| RouteSummary {
            method: route.method.as_str(),
            path: route.path().to_string(),
            handler: route.handler.name().to_string(),
            skip_auth: route.options.skip_auth,
        })
        .collect();

    HandlerResult::json(axum::http::StatusCode::OK, &summaries)
}
