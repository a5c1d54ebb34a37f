//! Key material and key providers.
//!
//! The codec never holds keys directly; it asks a [`KeyProvider`] for the
//! current [`Keyring`] on every operation, so keys can be rotated at runtime
//! without restarting and without breaking tokens sealed under a retired key.

use arc_swap::ArcSwap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{CodecConfig, TokenFormat};
use crate::crypto::cipher::LegacyCbc;

/// Errors raised while assembling key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("secret '{0}' is not set")]
    MissingSecret(String),

    #[error("key '{id}' is not valid base64")]
    InvalidEncoding { id: String },

    #[error("{name} must be {expected} bytes, got {actual}")]
    WrongLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// A named AES-256-GCM key.
#[derive(Clone)]
pub struct AeadKey {
    id: String,
    bytes: [u8; 32],
}

impl AeadKey {
    pub fn new(id: impl Into<String>, bytes: [u8; 32]) -> Self {
        Self { id: id.into(), bytes }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadKey").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Every key the codec may use: the active AEAD key, retired AEAD keys,
/// and optionally the legacy CBC key/IV pair.
#[derive(Debug, Default)]
pub struct Keyring {
    active: Option<String>,
    aead: Vec<AeadKey>,
    legacy: Option<LegacyCbc>,
}

impl Keyring {
    pub fn builder() -> KeyringBuilder {
        KeyringBuilder::default()
    }

    /// Key used for new v1 tokens.
    pub fn active(&self) -> Option<&AeadKey> {
        let id = self.active.as_deref()?;
        self.aead(id)
    }

    /// Look up an AEAD key by id, active or retired.
    pub fn aead(&self, id: &str) -> Option<&AeadKey> {
        self.aead.iter().find(|k| k.id == id)
    }

    pub fn legacy(&self) -> Option<&LegacyCbc> {
        self.legacy.as_ref()
    }

    /// Build a keyring from config, resolving secret names through `lookup`
    /// (normally the process environment).
    ///
    /// Keys the configured format needs are mandatory; the rest are loaded
    /// when present so older tokens can still be opened.
    pub fn from_config<F>(config: &CodecConfig, lookup: F) -> Result<Self, KeyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Keyring::builder();

        for source in &config.keys {
            let required =
                config.format == TokenFormat::AeadV1 && source.id == config.active_key_id;
            let Some(encoded) = lookup(&source.env) else {
                if required {
                    return Err(KeyError::MissingSecret(source.env.clone()));
                }
                tracing::warn!(
                    key_id = %source.id,
                    env = %source.env,
                    "Retired key not available, skipping"
                );
                continue;
            };

            let raw = BASE64
                .decode(encoded.trim())
                .map_err(|_| KeyError::InvalidEncoding { id: source.id.clone() })?;
            let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| KeyError::WrongLength {
                name: format!("key '{}'", source.id),
                expected: 32,
                actual: raw.len(),
            })?;

            builder = builder.aead(AeadKey::new(&source.id, bytes), required);
        }

        if let (Some(key_env), Some(iv_env)) = (&config.legacy_key_env, &config.legacy_iv_env) {
            match (lookup(key_env), lookup(iv_env)) {
                (Some(key), Some(iv)) => {
                    let key = fixed_16(key_env, &key)?;
                    let iv = fixed_16(iv_env, &iv)?;
                    builder = builder.legacy(LegacyCbc::new(key, iv));
                }
                (key, _) if config.format == TokenFormat::LegacyCbc => {
                    let missing = if key.is_none() { key_env } else { iv_env };
                    return Err(KeyError::MissingSecret(missing.clone()));
                }
                _ => {
                    tracing::warn!(
                        "Legacy key material not available, legacy tokens will be rejected"
                    );
                }
            }
        }

        Ok(builder.build())
    }
}

/// Incremental [`Keyring`] construction.
#[derive(Default)]
pub struct KeyringBuilder {
    inner: Keyring,
}

impl KeyringBuilder {
    /// Add an AEAD key; `active` marks it as the key for new tokens.
    pub fn aead(mut self, key: AeadKey, active: bool) -> Self {
        if active {
            self.inner.active = Some(key.id.clone());
        }
        self.inner.aead.retain(|k| k.id != key.id);
        self.inner.aead.push(key);
        self
    }

    pub fn legacy(mut self, cipher: LegacyCbc) -> Self {
        self.inner.legacy = Some(cipher);
        self
    }

    pub fn build(self) -> Keyring {
        self.inner
    }
}

fn fixed_16(name: &str, value: &str) -> Result<[u8; 16], KeyError> {
    value.as_bytes().try_into().map_err(|_| KeyError::WrongLength {
        name: name.to_string(),
        expected: 16,
        actual: value.len(),
    })
}

/// Source of the current key material.
pub trait KeyProvider: Send + Sync {
    fn keyring(&self) -> Arc<Keyring>;
}

/// Keyring held in memory and swapped atomically on rotation.
pub struct StaticKeyProvider {
    current: ArcSwap<Keyring>,
}

impl StaticKeyProvider {
    pub fn new(keyring: Keyring) -> Self {
        Self {
            current: ArcSwap::from_pointee(keyring),
        }
    }

    /// Replace the keyring. In-flight operations keep the one they loaded.
    pub fn rotate(&self, keyring: Keyring) {
        self.current.store(Arc::new(keyring));
        tracing::info!("Payload keyring rotated");
    }
}

impl KeyProvider for StaticKeyProvider {
    fn keyring(&self) -> Arc<Keyring> {
        self.current.load_full()
    }
}
