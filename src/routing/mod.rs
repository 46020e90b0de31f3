//! Routing subsystem for GET requests.
//!
//! # Data Flow
//! ```text
//! Raw request target
//!     → target.rs (split path, decode query)
//!     → router.rs (prefix lookup)
//!     → matcher.rs (evaluate prefix)
//!     → Return: handler, unknown name, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Handlers are plain function pointers, statically typed over their context

pub mod matcher;
pub mod router;
pub mod target;

pub use router::{GetHandler, RouteMatch, Router};
pub use target::{decode_target, DecodedTarget, QueryParams};
