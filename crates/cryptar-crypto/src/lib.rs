//! cryptar-crypto: primitives behind the cryptar container format
//!
//! Every archive mode ends up at the same interior:
//!
//! ```text
//! tar entries → gzip → XChaCha20-Poly1305 (empty AAD, streamed) → container
//! ```
//!
//! What differs per mode is how the 32-byte data key is established:
//!
//! - Password: Argon2d(password, salt, iterations, parallelism=1, memory KiB)
//! - Curve448: BLAKE2b-256 over an X448 shared secret
//! - Shard:    random key, Shamir (n,k)-split into per-file shares
//!
//! Key material ([`DataKey`], [`PrivateKey`]) is zeroized on drop and never
//! printed by `Debug`.

pub mod curve;
pub mod error;
pub mod kdf;
pub mod secret;
pub mod stream;

pub use curve::{generate_keypair, shared_data_key, PrivateKey, PublicKey};
pub use error::CryptoError;
pub use kdf::{derive_data_key, DataKey};
pub use secret::{combine, split, KeyShare};
pub use stream::{CipherReader, CipherWriter, StreamCipher};

/// Size of a data key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an X448 curve point (public or private)
pub const POINT_SIZE: usize = 56;
