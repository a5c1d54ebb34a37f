//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event, never interpolated-only messages
//! - Request id flows from the request-id layer into error envelopes
//! - Metric macros are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
