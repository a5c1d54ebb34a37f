//! HTTP plumbing subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, access log)
//!     → request.rs (x-request-id)
//!     → [pipeline stages]
//!     → deadline.rs (request deadline, inside the fault translator)
//!     → body.rs (bounded buffering for every body inspection)
//!     → payload.rs (decrypt request, encrypt response)
//!     → handlers.rs (demo application)
//!     → response.rs (short-circuit bodies for rejected requests)
//! ```

pub mod body;
pub mod deadline;
pub mod handlers;
pub mod payload;
pub mod request;
pub mod response;
pub mod server;

pub use payload::X_ENCRYPT_PAYLOAD;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::ShieldServer;
