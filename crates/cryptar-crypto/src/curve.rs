//! X448 key exchange and BLAKE2b key derivation
//!
//! Curve448-mode archives are sealed to a static public key: the writer
//! generates an ephemeral keypair, computes the X448 shared secret against
//! the static public key, and hashes it down to a 32-byte data key with
//! BLAKE2b. The reader recomputes the same secret from the ephemeral public
//! key stored in the archive header and the static private key.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{DataKey, KEY_SIZE, POINT_SIZE};

type Blake2b256 = Blake2b<U32>;

/// A static or ephemeral X448 public point.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: [u8; POINT_SIZE],
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; POINT_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:02x?}…)", &self.bytes[..4])
    }
}

/// An X448 private scalar. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey {
    bytes: [u8; POINT_SIZE],
}

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; POINT_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.bytes
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh X448 keypair.
pub fn generate_keypair() -> (PublicKey, PrivateKey) {
    let secret = x448::Secret::new(&mut rand_core::OsRng);
    let public = x448::PublicKey::from(&secret);

    let mut public_bytes = [0u8; POINT_SIZE];
    public_bytes.copy_from_slice(public.as_bytes().as_ref());
    let mut secret_bytes = [0u8; POINT_SIZE];
    secret_bytes.copy_from_slice(secret.as_bytes().as_ref());

    let keypair = (
        PublicKey::from_bytes(public_bytes),
        PrivateKey::from_bytes(secret_bytes),
    );
    secret_bytes.zeroize();
    keypair
}

/// Derive the 32-byte data key from an X448 exchange: BLAKE2b-256 over the
/// shared secret. A low-order or malformed point yields
/// [`CryptoError::KeyExchange`]. The shared secret is zeroized before this
/// function returns; the scalar itself only ever lives in the caller's
/// [`PrivateKey`], which zeroizes on drop.
pub fn shared_data_key(public: &PublicKey, private: &PrivateKey) -> CryptoResult<DataKey> {
    let secret = x448::Secret::from_bytes(private.as_bytes()).ok_or(CryptoError::KeyExchange)?;
    let point = x448::PublicKey::from_bytes(public.as_bytes()).ok_or(CryptoError::KeyExchange)?;

    let shared = secret
        .as_diffie_hellman(&point)
        .ok_or(CryptoError::KeyExchange)?;

    let mut shared_bytes = [0u8; POINT_SIZE];
    shared_bytes.copy_from_slice(shared.as_bytes().as_ref());

    let mut hash = Blake2b256::new();
    hash.update(&shared_bytes);
    shared_bytes.zeroize();

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(hash.finalize().as_slice());
    Ok(DataKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypairs_differ() {
        let (pub1, prv1) = generate_keypair();
        let (pub2, prv2) = generate_keypair();
        assert_ne!(pub1.as_bytes(), pub2.as_bytes());
        assert_ne!(prv1.as_bytes(), prv2.as_bytes());
    }

    #[test]
    fn test_exchange_is_symmetric() {
        let (alice_pub, alice_prv) = generate_keypair();
        let (bob_pub, bob_prv) = generate_keypair();

        let k1 = shared_data_key(&bob_pub, &alice_prv).unwrap();
        let k2 = shared_data_key(&alice_pub, &bob_prv).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes(), "DH must commute");
    }

    #[test]
    fn test_wrong_private_key_differs() {
        let (public, _) = generate_keypair();
        let (_, private) = generate_keypair();
        let (_, other) = generate_keypair();

        let k1 = shared_data_key(&public, &private).unwrap();
        let k2 = shared_data_key(&public, &other).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let (_, private) = generate_keypair();
        let zero = PublicKey::from_bytes([0u8; POINT_SIZE]);
        assert!(matches!(
            shared_data_key(&zero, &private),
            Err(CryptoError::KeyExchange)
        ));
    }

    #[test]
    fn test_debug_redacts_private() {
        let (_, private) = generate_keypair();
        assert!(format!("{private:?}").contains("REDACTED"));
    }
}
