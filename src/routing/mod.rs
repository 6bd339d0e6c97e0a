//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     register(method, pattern, handler, options)
//!     → matcher.rs (compile `/leads/{id}` or `/leads/:id`)
//!     → router.rs (append to ordered table)
//!     → Freeze as Arc<RouteTable>
//!
//! Incoming request (method, normalized path)
//!     → router.rs (scan in registration order)
//!     → matcher.rs (anchored match, extract params)
//!     → Return: matched Route + RouteParams, or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{compile, CompiledPattern, PatternError, RouteParams, Segment};
pub use router::{HandlerRegistry, Method, Route, RouteError, RouteOptions, RouteTable};
