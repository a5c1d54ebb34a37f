//! Pipeline composition.
//!
//! Wraps an application router in the protection stages, outermost first:
//!
//! ```text
//! request id → metrics → CSP header
//!     → exception translator
//!     → request deadline
//!     → IP allowlist
//!     → XSS guard → SQL injection guard
//!     → rate limiter
//!     → payload transform
//!     → application handler
//! ```
//!
//! Disabled stages are left out entirely rather than short-circuited.

use axum::{http::header::InvalidHeaderValue, middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ShieldConfig;
use crate::crypto::{KeyProvider, PayloadCodec};
use crate::detect::{Detector, SqlInjectionDetector, XssDetector};
use crate::fault::translate_faults;
use crate::http::deadline::enforce_deadline;
use crate::http::payload::{transform_payload, PayloadTransform};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::security::headers::content_security_policy;
use crate::security::{
    enforce_allowlist, guard_threats, rate_limit_middleware, AllowList, FixedWindowLimiter,
    RateLimitState, ThreatGuard,
};

/// Errors raised while assembling the pipeline.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("invalid detector pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid content security policy: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// The configured protection stages, ready to wrap a router.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<ShieldConfig>,
    codec: PayloadCodec,
    xss: Arc<dyn Detector>,
    sql: Arc<dyn Detector>,
    limiter: Arc<FixedWindowLimiter>,
    allowlist: Arc<AllowList>,
}

impl Pipeline {
    pub fn new(config: ShieldConfig, keys: Arc<dyn KeyProvider>) -> Result<Self, ShieldError> {
        // Fail at startup, not on the first response.
        content_security_policy(&config.security.content_security_policy)?;

        let codec = PayloadCodec::new(keys, config.codec.format);
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limiting));
        let allowlist = Arc::new(AllowList::new(
            config.security.allowed_ips.iter().copied(),
            config.rate_limiting.trust_forwarded_for,
        ));

        Ok(Self {
            codec,
            xss: Arc::new(XssDetector::new()?),
            sql: Arc::new(SqlInjectionDetector::new()?),
            limiter,
            allowlist,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }

    /// Wrap `app` in every enabled stage.
    pub fn wrap(&self, app: Router) -> Router {
        let config = &self.config;
        let max_body_bytes = config.payload.max_body_bytes;
        let trust_forwarded_for = config.rate_limiting.trust_forwarded_for;

        // `Router::layer` wraps what is already there, so stages are added innermost first.
        let mut router = app;

        if config.payload.enabled {
            router = router.layer(middleware::from_fn_with_state(
                PayloadTransform {
                    codec: self.codec.clone(),
                    max_body_bytes,
                },
                transform_payload,
            ));
        }

        if config.rate_limiting.enabled {
            router = router.layer(middleware::from_fn_with_state(
                RateLimitState {
                    limiter: self.limiter.clone(),
                    trust_forwarded_for,
                },
                rate_limit_middleware,
            ));
        }

        if config.threats.sql_injection_enabled {
            router = router.layer(middleware::from_fn_with_state(
                ThreatGuard {
                    detector: self.sql.clone(),
                    max_body_bytes,
                    trust_forwarded_for,
                },
                guard_threats,
            ));
        }

        if config.threats.xss_enabled {
            router = router.layer(middleware::from_fn_with_state(
                ThreatGuard {
                    detector: self.xss.clone(),
                    max_body_bytes,
                    trust_forwarded_for,
                },
                guard_threats,
            ));
        }

        if !self.allowlist.is_empty() {
            router = router.layer(middleware::from_fn_with_state(
                self.allowlist.clone(),
                enforce_allowlist,
            ));
        }

        router = router.layer(middleware::from_fn_with_state(
            Duration::from_secs(config.timeouts.request_secs),
            enforce_deadline,
        ));

        router = router.layer(middleware::from_fn_with_state(
            config.environment,
            translate_faults,
        ));

        // Checked in `new`.
        if let Ok(Some(csp)) = content_security_policy(&config.security.content_security_policy) {
            router = router.layer(csp);
        }

        router
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("environment", &self.config.environment)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AeadKey, Keyring, StaticKeyProvider};

    fn keys() -> Arc<dyn KeyProvider> {
        Arc::new(StaticKeyProvider::new(
            Keyring::builder().aead(AeadKey::new("k1", [3u8; 32]), true).build(),
        ))
    }

    #[test]
    fn test_bad_policy_rejected_at_build() {
        let mut config = ShieldConfig::default();
        config.security.content_security_policy = "default-src\n'self'".into();
        assert!(matches!(Pipeline::new(config, keys()), Err(ShieldError::Header(_))));
    }

    #[test]
    fn test_disabled_limiter_still_built() {
        let mut config = ShieldConfig::default();
        config.rate_limiting.enabled = false;
        let pipeline = Pipeline::new(config, keys()).unwrap();
        assert_eq!(pipeline.limiter().tracked_clients(), 0);
        assert!(!pipeline.config().rate_limiting.enabled);
    }
}
