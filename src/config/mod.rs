//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only payload keys reload (SIGHUP)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are never stored in the file, only the names of their sources

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CodecConfig, Environment, KeySource, ListenerConfig, ObservabilityConfig, PayloadConfig,
    RateLimitConfig, SecurityConfig, ShieldConfig, ThreatConfig, TimeoutConfig, TokenFormat,
};
