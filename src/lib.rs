//! Request protection pipeline for axum services.
//!
//! Wraps an application router in ordered interceptors: exception
//! translation, IP allowlisting, XSS and SQL injection screening,
//! per-client rate limiting and opt-in payload encryption.

// Core subsystems
pub mod config;
pub mod crypto;
pub mod detect;
pub mod fault;
pub mod http;
pub mod pipeline;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ShieldConfig;
pub use fault::{Fault, FaultKind};
pub use http::ShieldServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Pipeline, ShieldError};
