//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request (route without skip_auth):
//!     → auth.rs (API key check, attach Principal)
//!     → rate_limit.rs (per-client token bucket)
//!     → headers.rs (hardening response headers)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Each concern is one `Middleware`, installed in the order above
//! - Fail closed: reject on any security check failure
//! - No trust in client-supplied forwarding headers

pub mod auth;
pub mod headers;
pub mod rate_limit;

pub use auth::{ApiKeyAuth, Principal};
pub use headers::SecurityHeaders;
pub use rate_limit::RateLimiter;
