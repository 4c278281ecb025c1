//! Key derivation: Argon2d password → data key

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// The single 256-bit secret fed to the archive cipher, regardless of how it
/// was established. Zeroized on drop.
#[derive(Clone)]
pub struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh random data key (shard mode).
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a data key from a password with Argon2d.
///
/// The cost parameters travel in the archive header and are therefore
/// attacker-controllable on read; a bogus-parameter archive derives a wrong
/// key and fails tag verification downstream. Parameters the KDF itself
/// rejects (memory below the Argon2 floor, zero iterations) surface as
/// [`CryptoError::Kdf`].
pub fn derive_data_key(
    password: &SecretString,
    salt: &[u8],
    iterations: u32,
    memory_kib: u32,
) -> CryptoResult<DataKey> {
    let params = Params::new(memory_kib, iterations, 1, Some(KEY_SIZE))
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2d, Version::V0x13, params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;

    Ok(DataKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_kdf_deterministic() {
        let salt = [7u8; 32];
        let key1 = derive_data_key(&secret("hunter2"), &salt, 1, 8).unwrap();
        let key2 = derive_data_key(&secret("hunter2"), &salt, 1, 8).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passwords() {
        let salt = [7u8; 32];
        let key1 = derive_data_key(&secret("secret"), &salt, 1, 8).unwrap();
        let key2 = derive_data_key(&secret("terces"), &salt, 1, 8).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let key1 = derive_data_key(&secret("secret"), &[1u8; 32], 1, 8).unwrap();
        let key2 = derive_data_key(&secret("secret"), &[2u8; 32], 1, 8).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_costs() {
        let salt = [7u8; 32];
        let key1 = derive_data_key(&secret("secret"), &salt, 1, 8).unwrap();
        let key2 = derive_data_key(&secret("secret"), &salt, 2, 8).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_rejects_zero_iterations() {
        let salt = [7u8; 32];
        let err = derive_data_key(&secret("secret"), &salt, 0, 8);
        assert!(matches!(err, Err(CryptoError::Kdf(_))));
    }

    #[test]
    fn test_kdf_rejects_short_salt() {
        let err = derive_data_key(&secret("secret"), &[0u8; 4], 1, 8);
        assert!(matches!(err, Err(CryptoError::Kdf(_))));
    }

    #[test]
    fn test_random_keys_differ() {
        assert_ne!(DataKey::random().as_bytes(), DataKey::random().as_bytes());
    }

    #[test]
    fn test_debug_redacts() {
        let key = DataKey::random();
        let out = format!("{key:?}");
        assert!(out.contains("REDACTED"));
    }
}
