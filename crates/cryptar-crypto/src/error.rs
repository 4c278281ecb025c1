use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation parameters rejected: {0}")]
    Kdf(String),

    #[error("X448 key exchange produced a low-order result")]
    KeyExchange,

    #[error("secret sharing failed: {0}")]
    SecretSharing(String),
}
