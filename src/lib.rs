//! Line-oriented HTTP/1.0 bridge for driving a block world.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ServerConfig;
pub use http::{HttpServer, RequestStateMachine};
pub use lifecycle::Shutdown;
