use cryptar_crypto::CryptoError;
use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Header carries a version this build does not understand.
    #[error("unsupported archive version {0}")]
    InvalidVersion(u8),

    /// Header type byte matches no known archive mode.
    #[error("unknown archive type {0:#04x}")]
    UnknownType(u8),

    /// The file is a password archive, but a different driver opened it.
    #[error("file is a password archive")]
    PasswordArchive,

    /// The file is a curve448 archive, but a different driver opened it.
    #[error("file is a curve448 archive")]
    Curve448Archive,

    /// The file is a shard archive, but a different driver opened it.
    #[error("file is a shard archive")]
    ShardArchive,

    /// Tag verification failed: wrong key, wrong password, wrong private
    /// key, insufficient or bad shards, corruption, or truncation.
    #[error("archive verification failed")]
    InvalidArchive,

    #[error("invalid public key container")]
    InvalidPublicKey,

    #[error("invalid private key container")]
    InvalidPrivateKey,

    /// An entry body delivered fewer bytes than its header declared.
    #[error("entry body shorter than its declared size")]
    ShortCopy,

    #[error("X448 key exchange failed")]
    KeyExchangeFailed,

    #[error("key derivation parameters rejected: {0}")]
    KdfInvalid(String),

    #[error("shard threshold {threshold} out of range for {count} shard files")]
    InvalidThreshold { threshold: u8, count: usize },

    #[error("secret sharing failed: {0}")]
    SecretSharing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for ArchiveError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Kdf(msg) => ArchiveError::KdfInvalid(msg),
            CryptoError::KeyExchange => ArchiveError::KeyExchangeFailed,
            CryptoError::SecretSharing(msg) => ArchiveError::SecretSharing(msg),
        }
    }
}
