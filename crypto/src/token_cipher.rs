use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-256-GCM cipher for OAuth refresh tokens
///
/// Sealed values use the textual layout `hex(nonce):hex(tag):hex(ciphertext)`
/// with a fresh 96-bit nonce per call, so rows written by earlier deployments
/// stay readable as long as the key source is unchanged.
#[derive(ZeroizeOnDrop)]
pub struct TokenCipher {
    #[zeroize(skip)]
    cipher: Aes256Gcm,
    key: [u8; KEY_LEN],
}

impl TokenCipher {
    /// Build a cipher from raw key bytes. Only the first 32 bytes are used.
    pub fn new(key_bytes: &[u8]) -> CryptoResult<Self> {
        let Some(slice) = key_bytes.get(..KEY_LEN) else {
            return Err(CryptoError::InvalidKey(format!(
                "key must resolve to {} bytes, got {}",
                KEY_LEN,
                key_bytes.len()
            )));
        };

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(slice);

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher, key })
    }

    /// Build a cipher from the configured key source.
    ///
    /// A 44 character value, or any value containing `=`, is treated as
    /// base64. Anything else is used as UTF-8 bytes.
    pub fn from_key_source(source: &str) -> CryptoResult<Self> {
        let mut bytes = if source.len() == 44 || source.contains('=') {
            BASE64
                .decode(source)
                .map_err(|e| CryptoError::InvalidKey(format!("invalid base64 key: {}", e)))?
        } else {
            source.as_bytes().to_vec()
        };

        let result = Self::new(&bytes);
        bytes.zeroize();
        result
    }

    /// Generate a random key encoded the way `from_key_source` expects it
    pub fn generate_key_base64() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        let encoded = BASE64.encode(key);
        key.zeroize();
        encoded
    }

    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        // aes-gcm appends the tag to the ciphertext
        let split = sealed
            .len()
            .checked_sub(TAG_LEN)
            .ok_or_else(|| CryptoError::EncryptionFailed("sealed output too short".to_string()))?;
        let (ciphertext, tag) = sealed.split_at(split);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, payload: &str) -> CryptoResult<String> {
        let mut parts = payload.split(':');
        let (Some(nonce_hex), Some(tag_hex), Some(value_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidFormat(
                "expected nonce:tag:ciphertext".to_string(),
            ));
        };

        // the ciphertext segment is empty for an empty plaintext
        if nonce_hex.is_empty() || tag_hex.is_empty() {
            return Err(CryptoError::InvalidFormat("empty segment".to_string()));
        }

        let nonce_bytes = decode_hex(nonce_hex, "nonce")?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            )));
        }
        let tag = decode_hex(tag_hex, "tag")?;
        if tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "tag must be {} bytes, got {}",
                TAG_LEN,
                tag.len()
            )));
        }
        let mut sealed = decode_hex(value_hex, "ciphertext")?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

fn decode_hex(value: &str, segment: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(value)
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid {} hex: {}", segment, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTF8_KEY: &str = "dev-token-encryption-key-32-bytes";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let sealed = cipher.encrypt("1//0g-refresh-token").unwrap();

        assert_eq!(cipher.decrypt(&sealed).unwrap(), "1//0g-refresh-token");
    }

    #[test]
    fn test_sealed_layout() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let sealed = cipher.encrypt("abc").unwrap();
        let parts: Vec<&str> = sealed.split(':').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), NONCE_LEN * 2);
        assert_eq!(parts[1].len(), TAG_LEN * 2);
        assert_eq!(parts[2].len(), 3 * 2);
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let sealed = cipher.encrypt("").unwrap();

        assert!(sealed.ends_with(':'));
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "");
    }

    #[test]
    fn test_empty_ciphertext_still_authenticated() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let sealed = cipher.encrypt("").unwrap();
        let nonce = sealed.split(':').next().unwrap();
        let forged = format!("{}:{}:", nonce, "00".repeat(TAG_LEN));

        assert!(matches!(
            cipher.decrypt(&forged),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_base64_key_source() {
        let key = TokenCipher::generate_key_base64();
        assert_eq!(key.len(), 44);

        let cipher = TokenCipher::from_key_source(&key).unwrap();
        let sealed = cipher.encrypt("token").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "token");
    }

    #[test]
    fn test_base64_and_utf8_sources_differ() {
        // 44 chars without '=' is still decoded as base64
        let b64 = BASE64.encode([7u8; 33]);
        assert_eq!(b64.len(), 44);
        let decoded = TokenCipher::from_key_source(&b64).unwrap();
        let raw = TokenCipher::new(&[7u8; 32]).unwrap();

        let sealed = decoded.encrypt("x").unwrap();
        assert_eq!(raw.decrypt(&sealed).unwrap(), "x");
    }

    #[test]
    fn test_short_key_rejected() {
        let err = TokenCipher::from_key_source("too-short").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_short_base64_key_rejected() {
        let err = TokenCipher::from_key_source("c2hvcnQ=").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_long_key_truncated_to_32_bytes() {
        let long = format!("{}{}", UTF8_KEY, "-with-extra-material");
        let a = TokenCipher::from_key_source(&long).unwrap();
        let b = TokenCipher::new(&long.as_bytes()[..32]).unwrap();

        let sealed = a.encrypt("value").unwrap();
        assert_eq!(b.decrypt(&sealed).unwrap(), "value");
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let b = TokenCipher::from_key_source("another-key-that-is-32-bytes-long").unwrap();

        let sealed = a.encrypt("secret").unwrap();
        assert!(matches!(
            b.decrypt(&sealed),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let sealed = cipher.encrypt("secret").unwrap();
        let parts: Vec<&str> = sealed.split(':').collect();
        let bad_tag = "00".repeat(TAG_LEN);
        let tampered = format!("{}:{}:{}", parts[0], bad_tag, parts[2]);

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();

        for payload in ["", "abc", "a:b", "a:b:c:d", "::", "zz:zz:zz"] {
            assert!(
                matches!(cipher.decrypt(payload), Err(CryptoError::InvalidFormat(_))),
                "payload {:?} should be rejected as malformed",
                payload
            );
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let cipher = TokenCipher::from_key_source(UTF8_KEY).unwrap();
        let rendered = format!("{:?}", cipher);

        assert!(rendered.contains("AES-256-GCM"));
        assert!(!rendered.contains("dev-token"));
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip_any_utf8(plaintext in ".{0,256}") {
            let cipher = TokenCipher::from_key_source("dev-token-encryption-key-32-bytes").unwrap();
            let sealed = cipher.encrypt(&plaintext).unwrap();
            prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
        }
    }
}
