//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (IP allowlist)
//!     → threats.rs (XSS guard, then SQL injection guard)
//!     → rate_limit.rs (per-client fixed window)
//!     → payload transform / handler
//! Outgoing response:
//!     → headers.rs (Content-Security-Policy)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Rejections answer directly; they never raise faults
//! - Blocked threats never consume rate limit quota

pub mod access_control;
pub mod client;
pub mod headers;
pub mod rate_limit;
pub mod threats;

pub use access_control::{enforce_allowlist, AllowList};
pub use rate_limit::{
    rate_limit_middleware, Admission, FixedWindowLimiter, MemoryRateStore, RateLimitState,
    RateStore, WindowEntry,
};
pub use threats::{guard_threats, ThreatGuard};
