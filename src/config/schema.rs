//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shield.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration for the request shield.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Deployment environment; controls fault detail disclosure.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client rate limiting.
    pub rate_limiting: RateLimitConfig,

    /// XSS / SQL-injection detector switches.
    pub threats: ThreatConfig,

    /// Payload transform settings.
    pub payload: PayloadConfig,

    /// Key material sources and token format.
    pub codec: CodecConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Transport-level request deadline in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_duration_secs: u64,

    /// Penalty after the first denial, in minutes. Zero disables the penalty.
    pub blocked_duration_mins: u64,

    /// How often stale client entries are evicted, in seconds.
    pub sweep_interval_secs: u64,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_duration_secs: 60,
            blocked_duration_mins: 0,
            sweep_interval_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Threat detector switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreatConfig {
    pub xss_enabled: bool,
    pub sql_injection_enabled: bool,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            xss_enabled: true,
            sql_injection_enabled: true,
        }
    }
}

/// Payload transform configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Enable decrypt-on-entry / encrypt-on-exit.
    pub enabled: bool,

    /// Largest request or response body buffered by the pipeline.
    pub max_body_bytes: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Token format emitted by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum TokenFormat {
    /// AES-256-GCM with a per-message nonce and key id.
    #[default]
    #[serde(rename = "aead-v1")]
    AeadV1,
    /// AES-128-CBC with a fixed key/IV pair, as older clients expect.
    #[serde(rename = "legacy-cbc")]
    LegacyCbc,
}

/// Codec key sources. Key material is read from the environment, never from the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Format used when encrypting. Decryption accepts every configured format.
    pub format: TokenFormat,

    /// Id of the AEAD key used for new tokens.
    pub active_key_id: String,

    /// AEAD keys, current and retired.
    pub keys: Vec<KeySource>,

    /// Environment variable holding the 16-byte legacy key.
    pub legacy_key_env: Option<String>,

    /// Environment variable holding the 16-byte legacy IV.
    pub legacy_iv_env: Option<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: TokenFormat::AeadV1,
            active_key_id: "k1".to_string(),
            keys: vec![KeySource {
                id: "k1".to_string(),
                env: "SHIELD_KEY_K1".to_string(),
            }],
            legacy_key_env: None,
            legacy_iv_env: None,
        }
    }
}

/// Where one AEAD key comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeySource {
    /// Key id embedded in every token sealed with this key.
    pub id: String,

    /// Environment variable holding the base64-encoded 32-byte key.
    pub env: String,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Clients allowed to reach the service. Empty allows everyone.
    pub allowed_ips: Vec<IpAddr>,

    /// Value of the Content-Security-Policy response header. Empty disables it.
    pub content_security_policy: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_ips: Vec::new(),
            content_security_policy: "default-src 'self'; script-src 'self'; style-src 'self';"
                .to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
