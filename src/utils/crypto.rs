// Cryptographic utilities for Keydeck
//
// The record set is sealed with one key derived from a static pass-phrase.
// This keeps casual readers of the database away; anyone holding the
// pass-phrase (or the binary's default) can open it.

use crate::utils::{KeydeckError, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use zeroize::Zeroize;

/// Pass-phrase used when `KEYDECK_ENCRYPTION_KEY` is not set
pub const DEFAULT_PASSPHRASE: &str = "ai-api-manager-secret-key-2024";

/// Fixed salt for the pass-phrase derivation
const CODEC_SALT: &[u8] = b"keydeck-static-codec-salt";

/// PBKDF2 iterations for the codec key
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Key length (32 bytes for AES-256)
pub const KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length
const NONCE_LENGTH: usize = 12;

/// Derive a key from a pass-phrase using PBKDF2-SHA256
pub fn derive_key_from_passphrase(passphrase: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations.max(1), &mut key);
    key
}

/// Encrypt data using AES-256-GCM
pub fn encrypt_aes256_gcm(key: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| KeydeckError::Encode(format!("Encryption failed: {}", e)))?;

    // Return nonce + ciphertext
    let mut result = Vec::with_capacity(nonce.len() + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt data using AES-256-GCM
pub fn decrypt_aes256_gcm(key: &[u8; KEY_LENGTH], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LENGTH {
        return Err(KeydeckError::Decode("Invalid ciphertext: too short".to_string()));
    }

    let cipher = Aes256Gcm::new(key.into());
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);

    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| KeydeckError::Decode("Decryption failed - wrong key or corrupted data".to_string()))
}

/// Symmetric codec for JSON-serializable values under one fixed key
pub struct Codec {
    key: [u8; KEY_LENGTH],
}

impl Codec {
    /// Build a codec from a pass-phrase
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self {
            key: derive_key_from_passphrase(passphrase, CODEC_SALT, PBKDF2_ITERATIONS),
        }
    }

    /// Serialize `value` to JSON and seal it; returns base64 text
    pub fn encrypt<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| KeydeckError::Encode(format!("Value is not serializable: {}", e)))?;
        let sealed = encrypt_aes256_gcm(&self.key, &plaintext)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
    }

    /// Inverse of [`Codec::encrypt`]
    pub fn decrypt<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T> {
        let sealed = base64::engine::general_purpose::STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| KeydeckError::Decode(format!("Invalid base64: {}", e)))?;
        let plaintext = decrypt_aes256_gcm(&self.key, &sealed)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| KeydeckError::Decode(format!("Decrypted payload is not valid JSON: {}", e)))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_PASSPHRASE)
    }
}

impl Drop for Codec {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_encrypt_decrypt() {
        let key = derive_key_from_passphrase("secret", b"salt", 1_000);
        let plaintext = b"Hello, World!";

        let ciphertext = encrypt_aes256_gcm(&key, plaintext).unwrap();
        let decrypted = decrypt_aes256_gcm(&key, &ciphertext).unwrap();

        assert_eq!(plaintext.to_vec(), decrypted);
        assert_ne!(plaintext, &ciphertext[..]);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let key1 = derive_key_from_passphrase("one", b"salt", 1_000);
        let key2 = derive_key_from_passphrase("two", b"salt", 1_000);

        let ciphertext = encrypt_aes256_gcm(&key1, b"Secret message").unwrap();
        assert!(decrypt_aes256_gcm(&key2, &ciphertext).is_err());
    }

    #[test]
    fn test_key_derivation_is_deterministic() {
        let key1 = derive_key_from_passphrase("pass", b"salt", 1_000);
        let key2 = derive_key_from_passphrase("pass", b"salt", 1_000);
        let key3 = derive_key_from_passphrase("pass", b"other", 1_000);

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_codec_value_roundtrip() {
        let codec = Codec::default();
        let value = json!([{ "id": "a", "name": "Prod", "testCount": 3 }]);

        let sealed = codec.encrypt(&value).unwrap();
        assert!(!sealed.contains("Prod"));

        let opened: serde_json::Value = codec.decrypt(&sealed).unwrap();
        assert_eq!(opened, value);
    }

    #[test]
    fn test_codec_nonce_makes_ciphertexts_differ() {
        let codec = Codec::default();
        let a = codec.encrypt(&"same").unwrap();
        let b = codec.encrypt(&"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_codec_wrong_passphrase_is_decode_error() {
        let sealed = Codec::from_passphrase("first").encrypt(&vec![1, 2, 3]).unwrap();
        let result: Result<Vec<i32>> = Codec::from_passphrase("second").decrypt(&sealed);
        assert!(matches!(result, Err(KeydeckError::Decode(_))));
    }

    #[test]
    fn test_codec_rejects_malformed_input() {
        let codec = Codec::default();

        let not_base64: Result<serde_json::Value> = codec.decrypt("%%% not base64 %%%");
        assert!(matches!(not_base64, Err(KeydeckError::Decode(_))));

        let too_short: Result<serde_json::Value> = codec.decrypt("AAAA");
        assert!(matches!(too_short, Err(KeydeckError::Decode(_))));
    }

    #[test]
    fn test_codec_non_json_plaintext_is_decode_error() {
        let codec = Codec::from_passphrase("p");
        let key = derive_key_from_passphrase("p", CODEC_SALT, PBKDF2_ITERATIONS);
        let sealed = encrypt_aes256_gcm(&key, b"not json at all").unwrap();
        let text = base64::engine::general_purpose::STANDARD.encode(sealed);

        let result: Result<serde_json::Value> = codec.decrypt(&text);
        assert!(matches!(result, Err(KeydeckError::Decode(_))));
    }
}
