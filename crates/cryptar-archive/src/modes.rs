//! The three archive modes
//!
//! Each driver owns the runtime context for one key-establishment protocol
//! (open files, password, peer keys, threshold), serializes or parses its
//! outer header, derives or reconstructs the 32-byte data key, and hands off
//! to the shared inner pipeline. [`Archive`] is the uniform entry point the
//! CLI dispatches through.
//!
//! Every `reader()` rejects a wrong version or wrong archive type before any
//! key derivation, and runs the verify-only scan before exposing entries.

use rand::RngCore;
use secrecy::SecretString;
use tracing::debug;

use cryptar_crypto::{curve, kdf, secret, DataKey, KeyShare, PrivateKey, PublicKey};

use crate::archive::{ArchiveReader, ArchiveWriter, Volume};
use crate::error::{ArchiveError, ArchiveResult};
use crate::header::{ArchiveHeader, Curve448Header, PasswordHeader, ShardHeader, SALT_SIZE};

/// An archive in one of the three key-establishment modes.
pub enum Archive<F: Volume> {
    Password(PasswordArchive<F>),
    Curve448(Curve448Archive<F>),
    Shard(ShardArchive<F>),
}

impl<F: Volume> Archive<F> {
    pub fn writer(self) -> ArchiveResult<ArchiveWriter<F>> {
        match self {
            Archive::Password(a) => a.writer(),
            Archive::Curve448(a) => a.writer(),
            Archive::Shard(a) => a.writer(),
        }
    }

    pub fn reader(self) -> ArchiveResult<ArchiveReader<F>> {
        match self {
            Archive::Password(a) => a.reader(),
            Archive::Curve448(a) => a.reader(),
            Archive::Shard(a) => a.reader(),
        }
    }
}

/// Encrypted with a key derived from a password, cost parameters, and a
/// random salt using Argon2d.
pub struct PasswordArchive<F: Volume> {
    password: SecretString,
    iterations: u32,
    memory_kib: u32,
    file: F,
}

impl<F: Volume> PasswordArchive<F> {
    pub fn new(password: SecretString, iterations: u32, memory_kib: u32, file: F) -> Self {
        Self {
            password,
            iterations,
            memory_kib,
            file,
        }
    }

    pub fn writer(mut self) -> ArchiveResult<ArchiveWriter<F>> {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let header = PasswordHeader {
            iterations: self.iterations,
            memory_kib: self.memory_kib,
            salt,
        };
        ArchiveHeader::Password(header).encode(&mut self.file)?;

        let key = kdf::derive_data_key(&self.password, &salt, self.iterations, self.memory_kib)?;
        debug!(iterations = self.iterations, memory_kib = self.memory_kib, "password archive keyed");
        ArchiveWriter::create(vec![self.file], &key)
    }

    pub fn reader(mut self) -> ArchiveResult<ArchiveReader<F>> {
        let header = match ArchiveHeader::decode(&mut self.file)? {
            ArchiveHeader::Password(h) => h,
            other => return Err(other.wrong_type()),
        };

        let key = kdf::derive_data_key(
            &self.password,
            &header.salt,
            header.iterations,
            header.memory_kib,
        )?;
        ArchiveReader::open(self.file, Vec::new(), &key)
    }
}

/// Encrypted with a key derived by hashing the X448 shared secret of an
/// ephemeral private key and a static public key with BLAKE2b.
pub struct Curve448Archive<F: Volume> {
    public: Option<PublicKey>,
    private: Option<PrivateKey>,
    file: F,
}

impl<F: Volume> Curve448Archive<F> {
    /// Seal to a static public key (writing).
    pub fn to_public(public: PublicKey, file: F) -> Self {
        Self {
            public: Some(public),
            private: None,
            file,
        }
    }

    /// Open with a static private key (reading).
    pub fn with_private(private: PrivateKey, file: F) -> Self {
        Self {
            public: None,
            private: Some(private),
            file,
        }
    }

    pub fn writer(mut self) -> ArchiveResult<ArchiveWriter<F>> {
        let public = self.public.as_ref().ok_or(ArchiveError::InvalidPublicKey)?;

        let (ephemeral_public, ephemeral_private) = curve::generate_keypair();
        let key = curve::shared_data_key(public, &ephemeral_private)?;

        let header = Curve448Header {
            ephemeral: *ephemeral_public.as_bytes(),
        };
        ArchiveHeader::Curve448(header).encode(&mut self.file)?;
        debug!("curve448 archive keyed to static public key");

        ArchiveWriter::create(vec![self.file], &key)
    }

    pub fn reader(mut self) -> ArchiveResult<ArchiveReader<F>> {
        let header = match ArchiveHeader::decode(&mut self.file)? {
            ArchiveHeader::Curve448(h) => h,
            other => return Err(other.wrong_type()),
        };

        let private = self
            .private
            .as_ref()
            .ok_or(ArchiveError::InvalidPrivateKey)?;
        let ephemeral = PublicKey::from_bytes(header.ephemeral);
        let key = curve::shared_data_key(&ephemeral, private)?;

        ArchiveReader::open(self.file, Vec::new(), &key)
    }
}

/// Encrypted with a random key split into n Shamir shares, one archive file
/// per share; any k of them recover the key. Every file carries the complete
/// ciphertext.
pub struct ShardArchive<F: Volume> {
    threshold: u8,
    files: Vec<F>,
}

impl<F: Volume> ShardArchive<F> {
    /// `threshold` is only meaningful for writing; readers pass any value
    /// (the presented shards decide whether recovery succeeds).
    pub fn new(threshold: u8, files: Vec<F>) -> Self {
        Self { threshold, files }
    }

    pub fn writer(mut self) -> ArchiveResult<ArchiveWriter<F>> {
        let count = self.files.len();
        if count < 2 || count > 255 || (self.threshold as usize) > count || self.threshold < 2 {
            return Err(ArchiveError::InvalidThreshold {
                threshold: self.threshold,
                count,
            });
        }

        let key = DataKey::random();
        let shares = secret::split(&key, count as u8, self.threshold)?;

        for (share, file) in shares.iter().zip(&mut self.files) {
            let header = ShardHeader {
                id: share.id,
                share: share.data,
            };
            ArchiveHeader::Shard(header).encode(file)?;
        }
        debug!(shards = count, threshold = self.threshold, "data key split");

        ArchiveWriter::create(self.files, &key)
    }

    pub fn reader(mut self) -> ArchiveResult<ArchiveReader<F>> {
        let mut shares = Vec::with_capacity(self.files.len());
        for file in &mut self.files {
            let header = match ArchiveHeader::decode(file)? {
                ArchiveHeader::Shard(h) => h,
                other => return Err(other.wrong_type()),
            };
            shares.push(KeyShare {
                id: header.id,
                data: header.share,
            });
        }

        let key = secret::combine(&shares)?;
        debug!(shards = shares.len(), "data key recombined");

        // Every shard carries the same inner region; read from the first and
        // keep the rest open until close.
        let mut files = self.files.into_iter();
        let first = files
            .next()
            .ok_or_else(|| ArchiveError::SecretSharing("no shard files".into()))?;
        ArchiveReader::open(first, files.collect(), &key)
    }
}
