//! Payload cryptography subsystem.
//!
//! # Data Flow
//! ```text
//! encrypt:  plaintext → cipher.rs (v1 AEAD or legacy CBC) → encoding.rs (base64 + escape)
//! decrypt:  token → encoding.rs (unescape + base64) → dispatch on "v1." prefix → cipher.rs
//! ```
//!
//! # Design Decisions
//! - Key material comes from a `KeyProvider`, loaded per operation (rotation-safe)
//! - New tokens use the configured format; decryption accepts every known format
//! - Empty or whitespace-only input maps to empty output, never to an error

pub mod cipher;
pub mod encoding;
pub mod keys;

use std::sync::Arc;
use thiserror::Error;

use crate::config::TokenFormat;
use self::cipher::V1_PREFIX;
pub use self::cipher::LegacyCbc;
pub use self::keys::{AeadKey, KeyError, KeyProvider, Keyring, StaticKeyProvider};

/// Errors raised while encoding or decoding payload tokens.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded payload is not valid UTF-8")]
    Utf8,

    #[error("cipher padding is invalid")]
    Padding,

    #[error("token failed authentication")]
    Authentication,

    #[error("token is truncated")]
    Truncated,

    #[error("token was sealed with unknown key '{0}'")]
    UnknownKey(String),

    #[error("token format is not accepted by this server")]
    UnsupportedFormat,

    #[error("no {0} key is configured")]
    MissingKey(&'static str),

    #[error("encryption failed")]
    Encrypt,
}

impl CodecError {
    /// True when the failure is the client's token, not the server's keys.
    pub fn is_malformed_token(&self) -> bool {
        !matches!(self, CodecError::MissingKey(_) | CodecError::Encrypt)
    }
}

/// Encrypts and decrypts wire tokens.
#[derive(Clone)]
pub struct PayloadCodec {
    keys: Arc<dyn KeyProvider>,
    format: TokenFormat,
}

impl PayloadCodec {
    pub fn new(keys: Arc<dyn KeyProvider>, format: TokenFormat) -> Self {
        Self { keys, format }
    }

    /// Encrypt `plaintext` into a text-safe token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        if plaintext.trim().is_empty() {
            return Ok(String::new());
        }

        let keyring = self.keys.keyring();
        let token = match self.format {
            TokenFormat::AeadV1 => {
                let key = keyring.active().ok_or(CodecError::MissingKey("active AEAD"))?;
                cipher::seal_v1(key, plaintext)?
            }
            TokenFormat::LegacyCbc => keyring
                .legacy()
                .ok_or(CodecError::MissingKey("legacy CBC"))?
                .seal(plaintext),
        };

        Ok(encoding::wrap(&token))
    }

    /// Decrypt a token produced by [`PayloadCodec::encrypt`] (any format).
    pub fn decrypt(&self, text: &str) -> Result<String, CodecError> {
        let token = encoding::unwrap(text)?;
        if token.is_empty() {
            return Ok(String::new());
        }

        let keyring = self.keys.keyring();
        if token.starts_with(V1_PREFIX) {
            cipher::open_v1(&keyring, &token)
        } else {
            keyring
                .legacy()
                .ok_or(CodecError::UnsupportedFormat)?
                .open(&token)
        }
    }
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
