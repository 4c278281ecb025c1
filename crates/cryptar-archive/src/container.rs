//! Password-protected key containers
//!
//! A container stores one X448 curve point, encrypted under an
//! Argon2d-derived key with XChaCha20-Poly1305. Layout:
//!
//! ```text
//! 0 version | 1 type (1=public, 2=private) | 2..6 iterations | 6..10 memory
//! 10..42 salt | 42..58 tag | 58..82 nonce | 82..138 encrypted point
//! ```
//!
//! Public-key containers conventionally use the empty password; the AEAD tag
//! still binds the stored point to the file. Requesting the wrong type is a
//! typed error and no decryption is attempted.

use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{KeyInit, Tag, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use secrecy::SecretString;
use std::io::{self, Read, Write};
use zeroize::Zeroize;

use cryptar_crypto::{kdf, PrivateKey, PublicKey, NONCE_SIZE, POINT_SIZE, TAG_SIZE};

use crate::error::{ArchiveError, ArchiveResult};
use crate::header::{SALT_SIZE, VERSION};
use crate::wire;

const TYPE_PUBLIC: u8 = 1;
const TYPE_PRIVATE: u8 = 2;

struct ContainerHeader {
    kind: u8,
    iterations: u32,
    memory_kib: u32,
    salt: [u8; SALT_SIZE],
    tag: [u8; TAG_SIZE],
    nonce: [u8; NONCE_SIZE],
    point: [u8; POINT_SIZE],
}

impl ContainerHeader {
    fn encode<W: Write>(&self, w: &mut W) -> ArchiveResult<()> {
        wire::write_u8(w, VERSION)?;
        wire::write_u8(w, self.kind)?;
        wire::write_u32_le(w, self.iterations)?;
        wire::write_u32_le(w, self.memory_kib)?;
        wire::write_bytes(w, &self.salt)?;
        wire::write_bytes(w, &self.tag)?;
        wire::write_bytes(w, &self.nonce)?;
        wire::write_bytes(w, &self.point)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> ArchiveResult<Self> {
        let version = wire::read_u8(r)?;
        if version != VERSION {
            return Err(ArchiveError::InvalidVersion(version));
        }
        Ok(Self {
            kind: wire::read_u8(r)?,
            iterations: wire::read_u32_le(r)?,
            memory_kib: wire::read_u32_le(r)?,
            salt: wire::read_array(r)?,
            tag: wire::read_array(r)?,
            nonce: wire::read_array(r)?,
            point: wire::read_array(r)?,
        })
    }
}

/// One key container file plus the password and KDF parameters protecting it.
pub struct KeyContainer<F> {
    file: F,
    password: SecretString,
    iterations: u32,
    memory_kib: u32,
}

impl<F: Read + Write> KeyContainer<F> {
    pub fn new(file: F, password: SecretString, iterations: u32, memory_kib: u32) -> Self {
        Self {
            file,
            password,
            iterations,
            memory_kib,
        }
    }

    pub fn write_public(&mut self, key: &PublicKey) -> ArchiveResult<()> {
        self.seal(TYPE_PUBLIC, *key.as_bytes())
    }

    pub fn write_private(&mut self, key: &PrivateKey) -> ArchiveResult<()> {
        self.seal(TYPE_PRIVATE, *key.as_bytes())
    }

    pub fn read_public(&mut self) -> ArchiveResult<PublicKey> {
        let point = self.open(TYPE_PUBLIC)?;
        Ok(PublicKey::from_bytes(point))
    }

    pub fn read_private(&mut self) -> ArchiveResult<PrivateKey> {
        let mut point = self.open(TYPE_PRIVATE)?;
        let key = PrivateKey::from_bytes(point);
        point.zeroize();
        Ok(key)
    }

    fn seal(&mut self, kind: u8, mut point: [u8; POINT_SIZE]) -> ArchiveResult<()> {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let key = kdf::derive_data_key(&self.password, &salt, self.iterations, self.memory_kib)?;
        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
        let tag = cipher
            .encrypt_in_place_detached(XNonce::from_slice(&nonce), b"", &mut point)
            .map_err(|_| {
                ArchiveError::Io(io::Error::new(io::ErrorKind::Other, "container seal failed"))
            })?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(tag.as_slice());

        let header = ContainerHeader {
            kind,
            iterations: self.iterations,
            memory_kib: self.memory_kib,
            salt,
            tag: tag_bytes,
            nonce,
            point,
        };
        header.encode(&mut self.file)
    }

    fn open(&mut self, kind: u8) -> ArchiveResult<[u8; POINT_SIZE]> {
        let wrong_key = match kind {
            TYPE_PUBLIC => ArchiveError::InvalidPublicKey,
            _ => ArchiveError::InvalidPrivateKey,
        };

        let mut header = ContainerHeader::decode(&mut self.file)?;
        if header.kind != kind {
            return Err(wrong_key);
        }

        let key = kdf::derive_data_key(
            &self.password,
            &header.salt,
            header.iterations,
            header.memory_kib,
        )?;
        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
        cipher
            .decrypt_in_place_detached(
                XNonce::from_slice(&header.nonce),
                b"",
                &mut header.point,
                Tag::from_slice(&header.tag),
            )
            .map_err(|_| wrong_key)?;

        Ok(header.point)
    }
}
