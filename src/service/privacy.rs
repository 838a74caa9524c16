//! Caller phone privacy: one-way hashing for correlation, reversible
//! encryption for the break-glass path, masking for anything pushed to
//! dashboards.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::env;

const ENV_PHONE_SALT: &str = "MAITRI_PHONE_SALT";
const ENV_ENCRYPTION_KEY: &str = "MAITRI_ENCRYPTION_KEY";

// Salt must persist across restarts or caller hashes stop matching
const DEFAULT_PHONE_SALT: &str = "maitri-stable-salt-2024";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Shown in place of a number that was never captured or failed to decrypt
pub const MASKED_PLACEHOLDER: &str = "****-****-XXXX";

/// Shown on the dashboard when a stored ciphertext no longer decrypts
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "****-DECRYPTION-ERROR****";

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Invalid encrypted payload")]
    InvalidPayload,

    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Cryptographic operation failed")]
    Crypto,
}

/// Holds the hashing salt and the AES-256-GCM key for phone numbers
#[derive(Clone)]
pub struct PhoneVault {
    salt: String,
    key: [u8; KEY_LEN],
}

impl PhoneVault {
    /// Build the vault from the environment. A missing encryption key falls
    /// back to all zeroes so demo deployments still run, with a loud warning.
    pub fn from_env() -> Result<Self, VaultError> {
        let salt = env::var(ENV_PHONE_SALT).unwrap_or_else(|_| DEFAULT_PHONE_SALT.to_string());

        let key = match env::var(ENV_ENCRYPTION_KEY) {
            Ok(hex) => parse_key_hex(&hex)?,
            Err(_) => {
                tracing::warn!(
                    "MAITRI_ENCRYPTION_KEY is not set, using zero fallback key. \
                     Generate one with: openssl rand -hex 32. NOT safe for production"
                );
                [0u8; KEY_LEN]
            }
        };

        Ok(Self { salt, key })
    }

    #[cfg(test)]
    pub fn with_key(salt: &str, key: [u8; KEY_LEN]) -> Self {
        Self {
            salt: salt.to_string(),
            key,
        }
    }

    /// Salted SHA-256 of the phone number, hex encoded. Stable across
    /// restarts so repeat callers correlate.
    pub fn hash_phone(&self, phone: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(phone.as_bytes());
        hasher.update(self.salt.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Encrypt a phone number to `nonce_b64:ciphertext_b64`
    pub fn encrypt_phone(&self, phone: &str) -> Result<String, VaultError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| VaultError::Crypto)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, phone.as_bytes())
            .map_err(|_| VaultError::Crypto)?;

        Ok(format!(
            "{}:{}",
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext)
        ))
    }

    /// Decrypt a `nonce_b64:ciphertext_b64` payload back to the number
    pub fn decrypt_phone(&self, payload: &str) -> Result<String, VaultError> {
        let (nonce_b64, ciphertext_b64) =
            payload.split_once(':').ok_or(VaultError::InvalidPayload)?;

        let nonce_raw = BASE64.decode(nonce_b64.as_bytes())?;
        if nonce_raw.len() != NONCE_LEN {
            return Err(VaultError::InvalidPayload);
        }
        let ciphertext = BASE64.decode(ciphertext_b64.as_bytes())?;

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| VaultError::Crypto)?;
        let nonce = Nonce::from_slice(&nonce_raw);
        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| VaultError::Crypto)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::Crypto)
    }

    /// Mask a decrypted number down to its last four digits
    pub fn mask_phone(phone: &str) -> String {
        let tail: String = if phone.len() >= 4 {
            phone[phone.len() - 4..].to_string()
        } else {
            phone.to_string()
        };
        format!("****-****-{}", tail)
    }
}

fn parse_key_hex(hex: &str) -> Result<[u8; KEY_LEN], VaultError> {
    let hex = hex.trim();
    if hex.len() != KEY_LEN * 2 {
        return Err(VaultError::InvalidKey(format!(
            "expected {} hex characters, got {}",
            KEY_LEN * 2,
            hex.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    for (i, byte) in key.iter_mut().enumerate() {
        let pair = &hex[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| VaultError::InvalidKey(format!("invalid hex at offset {}", i * 2)))?;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> PhoneVault {
        PhoneVault::with_key("test-salt", [7u8; KEY_LEN])
    }

    #[test]
    fn hash_is_deterministic_and_salted() {
        let vault = test_vault();
        let a = vault.hash_phone("+918340570832");
        let b = vault.hash_phone("+918340570832");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other_salt = PhoneVault::with_key("other-salt", [7u8; KEY_LEN]);
        assert_ne!(a, other_salt.hash_phone("+918340570832"));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let vault = test_vault();
        let payload = vault.encrypt_phone("+918340570832").unwrap();

        assert!(payload.contains(':'));
        assert!(!payload.contains("8340570832"));

        let decrypted = vault.decrypt_phone(&payload).unwrap();
        assert_eq!(decrypted, "+918340570832");
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let vault = test_vault();
        let a = vault.encrypt_phone("+918340570832").unwrap();
        let b = vault.encrypt_phone("+918340570832").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_garbage() {
        let vault = test_vault();
        assert!(matches!(
            vault.decrypt_phone("no-separator"),
            Err(VaultError::InvalidPayload)
        ));
        assert!(vault.decrypt_phone("AAAA:AAAA").is_err());
    }

    #[test]
    fn decrypt_rejects_wrong_key() {
        let vault = test_vault();
        let payload = vault.encrypt_phone("+918340570832").unwrap();

        let wrong = PhoneVault::with_key("test-salt", [9u8; KEY_LEN]);
        assert!(matches!(
            wrong.decrypt_phone(&payload),
            Err(VaultError::Crypto)
        ));
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(PhoneVault::mask_phone("+918340570832"), "****-****-0832");
        assert_eq!(PhoneVault::mask_phone("123"), "****-****-123");
    }

    #[test]
    fn key_hex_parsing() {
        assert!(parse_key_hex(&"ab".repeat(32)).is_ok());
        assert!(parse_key_hex("abcd").is_err());
        assert!(parse_key_hex(&"zz".repeat(32)).is_err());
    }
}
