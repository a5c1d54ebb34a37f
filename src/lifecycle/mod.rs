//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl+C → Shutdown::trigger
//!
//! Reload (reload.rs):
//!     SIGHUP → re-read codec section and key material → StaticKeyProvider::rotate
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast → server stops accepting, drains in-flight requests
//!                         → rate limit sweeper exits
//! ```

pub mod reload;
pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
