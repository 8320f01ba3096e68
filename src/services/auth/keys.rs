/*
 * Responsibility
 * - Process-wide key material (HMAC signing key, AEAD session key)
 * - Loaded once at startup, read-only afterwards, never printed
 */
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use super::error::{AuthError, AuthResult};

/// HMAC-SHA256 secret for bearer tokens.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(AuthError::Configuration(
                "signing key must not be empty".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// 256-bit ChaCha20-Poly1305 key for session cookies.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Accepts 64 hex chars, base64url (no pad) or standard base64 of 32 bytes,
    /// or a raw 32-byte string.
    pub fn parse(raw: &str) -> AuthResult<Self> {
        parse_key_material(raw).map(Self).ok_or_else(|| {
            AuthError::Configuration(
                "session encryption key must decode to exactly 32 bytes".to_string(),
            )
        })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

fn parse_key_material(raw: &str) -> Option<[u8; 32]> {
    let trimmed = raw.trim();

    if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = hex::decode(trimmed).ok()?;
        return bytes.as_slice().try_into().ok();
    }

    for engine in [&URL_SAFE_NO_PAD, &STANDARD] {
        if let Ok(bytes) = engine.decode(trimmed)
            && bytes.len() == 32
        {
            return bytes.as_slice().try_into().ok();
        }
    }

    trimmed.as_bytes().try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_signing_key_is_a_configuration_error() {
        assert!(matches!(
            SigningKey::new(Vec::new()),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn encryption_key_accepts_hex_and_base64() {
        let bytes = [7u8; 32];
        let hex_key = EncryptionKey::parse(&hex::encode(bytes)).unwrap();
        let b64_key = EncryptionKey::parse(&URL_SAFE_NO_PAD.encode(bytes)).unwrap();
        assert_eq!(hex_key.as_bytes(), &bytes);
        assert_eq!(b64_key.as_bytes(), &bytes);
    }

    #[test]
    fn encryption_key_rejects_wrong_length() {
        assert!(EncryptionKey::parse("too-short").is_err());
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let key = SigningKey::new(b"super-secret".to_vec()).unwrap();
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
