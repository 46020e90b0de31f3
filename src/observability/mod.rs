//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Parser, server and application produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every connection runs inside a span carrying its connection and request IDs
//! - Metrics are cheap (atomic increments) and off unless enabled

pub mod logging;
pub mod metrics;
