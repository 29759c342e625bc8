//! HTTP/JSON surface of the course progress platform.
//!
//! Exposes config, state, error handling, the identity extractor and the
//! router builder so the binary and integration tests share one stack.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod router;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use router::build_app_router;
pub use state::AppState;
