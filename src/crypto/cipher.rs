//! Symmetric ciphers behind the payload codec.
//!
//! Two token shapes exist:
//! - legacy: `base64(AES-128-CBC-PKCS7(key, iv, plaintext))` with a fixed key/IV pair
//! - v1: `v1.<key id>.base64(nonce ‖ AES-256-GCM(plaintext) ‖ tag)`, key id bound as AAD

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::crypto::keys::{AeadKey, Keyring};
use crate::crypto::CodecError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Prefix identifying a v1 token.
pub const V1_PREFIX: &str = "v1.";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Fixed key/IV AES-128-CBC cipher spoken by older clients.
#[derive(Clone)]
pub struct LegacyCbc {
    key: [u8; 16],
    iv: [u8; 16],
}

impl LegacyCbc {
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    /// Encrypt and base64-encode.
    pub fn seal(&self, plaintext: &str) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        BASE64.encode(ciphertext)
    }

    /// Reverse [`LegacyCbc::seal`].
    pub fn open(&self, token: &str) -> Result<String, CodecError> {
        let ciphertext = BASE64.decode(token.trim())?;
        let plaintext = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CodecError::Padding)?;
        String::from_utf8(plaintext).map_err(|_| CodecError::Utf8)
    }
}

impl std::fmt::Debug for LegacyCbc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LegacyCbc { .. }")
    }
}

/// Seal `plaintext` under `key` with a fresh random nonce.
pub fn seal_v1(key: &AeadKey, plaintext: &str) -> Result<String, CodecError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let payload = Payload {
        msg: plaintext.as_bytes(),
        aad: key.id().as_bytes(),
    };
    let ciphertext = cipher
        .encrypt(&nonce, payload)
        .map_err(|_| CodecError::Encrypt)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);

    Ok(format!("{}{}.{}", V1_PREFIX, key.id(), BASE64.encode(sealed)))
}

/// Open a v1 token, looking its key up by id in `keyring`.
pub fn open_v1(keyring: &Keyring, token: &str) -> Result<String, CodecError> {
    let rest = token
        .strip_prefix(V1_PREFIX)
        .ok_or(CodecError::Truncated)?;
    let (key_id, body) = rest.split_once('.').ok_or(CodecError::Truncated)?;

    let key = keyring
        .aead(key_id)
        .ok_or_else(|| CodecError::UnknownKey(key_id.to_string()))?;

    let sealed = BASE64.decode(body)?;
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CodecError::Truncated);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
    let payload = Payload {
        msg: ciphertext,
        aad: key.id().as_bytes(),
    };
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| CodecError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CodecError::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> LegacyCbc {
        LegacyCbc::new(*b"4090909090909020", *b"4090909090909020")
    }

    #[test]
    fn test_legacy_known_vector_shape() {
        // One full PKCS7 block for a 15-byte input, two for 16 bytes.
        let short = BASE64.decode(legacy().seal("fifteen bytes!!")).unwrap();
        let full = BASE64.decode(legacy().seal("sixteen bytes!!!")).unwrap();
        assert_eq!(short.len(), 16);
        assert_eq!(full.len(), 32);
    }

    #[test]
    fn test_legacy_round_trip_is_deterministic() {
        let cipher = legacy();
        let a = cipher.seal("{\"user\":\"admin\"}");
        let b = cipher.seal("{\"user\":\"admin\"}");
        assert_eq!(a, b);
        assert_eq!(cipher.open(&a).unwrap(), "{\"user\":\"admin\"}");
    }

    #[test]
    fn test_legacy_wrong_key_fails() {
        let token = legacy().seal("secret payload");
        let other = LegacyCbc::new(*b"0123456789ABCDEF", *b"0123456789ABCDEF");
        // A wrong key yields garbage that almost never carries valid padding and UTF-8.
        assert_ne!(other.open(&token).ok().as_deref(), Some("secret payload"));
    }

    #[test]
    fn test_legacy_rejects_partial_block() {
        assert!(matches!(legacy().open("AAAA"), Err(CodecError::Padding)));
    }

    #[test]
    fn test_v1_round_trip_and_nonce_freshness() {
        let key = AeadKey::new("k1", [7u8; 32]);
        let keyring = Keyring::builder().aead(key.clone(), true).build();

        let a = seal_v1(&key, "hello").unwrap();
        let b = seal_v1(&key, "hello").unwrap();
        assert!(a.starts_with("v1.k1."));
        assert_ne!(a, b);
        assert_eq!(open_v1(&keyring, &a).unwrap(), "hello");
    }

    #[test]
    fn test_v1_tamper_detected() {
        let key = AeadKey::new("k1", [7u8; 32]);
        let keyring = Keyring::builder().aead(key.clone(), true).build();
        let token = seal_v1(&key, "hello").unwrap();

        let (prefix, body) = token.rsplit_once('.').unwrap();
        let mut raw = BASE64.decode(body).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = format!("{}.{}", prefix, BASE64.encode(raw));

        assert!(matches!(open_v1(&keyring, &tampered), Err(CodecError::Authentication)));
    }

    #[test]
    fn test_v1_key_id_is_authenticated() {
        let k1 = AeadKey::new("k1", [7u8; 32]);
        let k2 = AeadKey::new("k2", [7u8; 32]);
        let keyring = Keyring::builder().aead(k1.clone(), true).aead(k2, false).build();

        let token = seal_v1(&k1, "hello").unwrap();
        let relabelled = token.replacen("v1.k1.", "v1.k2.", 1);
        assert!(matches!(open_v1(&keyring, &relabelled), Err(CodecError::Authentication)));
    }

    #[test]
    fn test_v1_unknown_key() {
        let key = AeadKey::new("old", [1u8; 32]);
        let token = seal_v1(&key, "hello").unwrap();
        let keyring = Keyring::builder().aead(AeadKey::new("new", [2u8; 32]), true).build();
        assert!(matches!(
            open_v1(&keyring, &token),
            Err(CodecError::UnknownKey(id)) if id == "old"
        ));
    }
}
