//! Outer archive headers
//!
//! Byte layout (offsets from the start of the file, scalars little-endian):
//!
//! ```text
//! Password: 0 version | 1 type=1 | 2..6 iterations | 6..10 memory | 10..42 salt
//! Curve448: 0 version | 1 type=2 | 2..58 ephemeral public key
//! Shard:    0 version | 1 type=3 | 2 share id | 3..35 share
//! ```
//!
//! The inner preamble (16-byte tag slot + 24-byte nonce) follows immediately
//! and belongs to the streaming pipeline, not to these records. Headers are
//! pure wire data; runtime driver context (files, passwords, peer keys) lives
//! in the mode drivers.

use std::io::{Read, Write};

use cryptar_crypto::{KEY_SIZE, POINT_SIZE};

use crate::error::{ArchiveError, ArchiveResult};
use crate::wire;

/// On-disk format version. Anything else is fatal.
pub const VERSION: u8 = 1;

/// Size of the salt in password archives and key containers.
pub const SALT_SIZE: usize = 32;

const TYPE_PASSWORD: u8 = 1;
const TYPE_CURVE448: u8 = 2;
const TYPE_SHARD: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHeader {
    pub iterations: u32,
    pub memory_kib: u32,
    pub salt: [u8; SALT_SIZE],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curve448Header {
    pub ephemeral: [u8; POINT_SIZE],
}

#[derive(Clone, PartialEq, Eq)]
pub struct ShardHeader {
    pub id: u8,
    pub share: [u8; KEY_SIZE],
}

impl std::fmt::Debug for ShardHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHeader")
            .field("id", &self.id)
            .field("share", &"[REDACTED]")
            .finish()
    }
}

/// The tagged outer header of an archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveHeader {
    Password(PasswordHeader),
    Curve448(Curve448Header),
    Shard(ShardHeader),
}

impl ArchiveHeader {
    pub fn encode<W: Write>(&self, w: &mut W) -> ArchiveResult<()> {
        wire::write_u8(w, VERSION)?;
        match self {
            ArchiveHeader::Password(h) => {
                wire::write_u8(w, TYPE_PASSWORD)?;
                wire::write_u32_le(w, h.iterations)?;
                wire::write_u32_le(w, h.memory_kib)?;
                wire::write_bytes(w, &h.salt)?;
            }
            ArchiveHeader::Curve448(h) => {
                wire::write_u8(w, TYPE_CURVE448)?;
                wire::write_bytes(w, &h.ephemeral)?;
            }
            ArchiveHeader::Shard(h) => {
                wire::write_u8(w, TYPE_SHARD)?;
                wire::write_u8(w, h.id)?;
                wire::write_bytes(w, &h.share)?;
            }
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> ArchiveResult<Self> {
        let version = wire::read_u8(r)?;
        if version != VERSION {
            return Err(ArchiveError::InvalidVersion(version));
        }

        match wire::read_u8(r)? {
            TYPE_PASSWORD => Ok(ArchiveHeader::Password(PasswordHeader {
                iterations: wire::read_u32_le(r)?,
                memory_kib: wire::read_u32_le(r)?,
                salt: wire::read_array(r)?,
            })),
            TYPE_CURVE448 => Ok(ArchiveHeader::Curve448(Curve448Header {
                ephemeral: wire::read_array(r)?,
            })),
            TYPE_SHARD => Ok(ArchiveHeader::Shard(ShardHeader {
                id: wire::read_u8(r)?,
                share: wire::read_array(r)?,
            })),
            other => Err(ArchiveError::UnknownType(other)),
        }
    }

    /// Error naming what this file actually is, for a driver that expected
    /// a different mode.
    pub fn wrong_type(&self) -> ArchiveError {
        match self {
            ArchiveHeader::Password(_) => ArchiveError::PasswordArchive,
            ArchiveHeader::Curve448(_) => ArchiveError::Curve448Archive,
            ArchiveHeader::Shard(_) => ArchiveError::ShardArchive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_header_layout() {
        let header = ArchiveHeader::Password(PasswordHeader {
            iterations: 3,
            memory_kib: 16,
            salt: [0xAA; SALT_SIZE],
        });

        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        assert_eq!(buf.len(), 42);
        assert_eq!(buf[0], VERSION);
        assert_eq!(buf[1], TYPE_PASSWORD);
        assert_eq!(buf[2..6], 3u32.to_le_bytes());
        assert_eq!(buf[6..10], 16u32.to_le_bytes());
        assert_eq!(buf[10..42], [0xAA; 32]);

        assert_eq!(ArchiveHeader::decode(&mut &buf[..]).unwrap(), header);
    }

    #[test]
    fn curve448_header_layout() {
        let header = ArchiveHeader::Curve448(Curve448Header {
            ephemeral: [0x55; POINT_SIZE],
        });

        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        assert_eq!(buf.len(), 58);
        assert_eq!(buf[1], TYPE_CURVE448);
        assert_eq!(buf[2..58], [0x55; 56]);

        assert_eq!(ArchiveHeader::decode(&mut &buf[..]).unwrap(), header);
    }

    #[test]
    fn shard_header_layout() {
        let header = ArchiveHeader::Shard(ShardHeader {
            id: 2,
            share: [0x11; KEY_SIZE],
        });

        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        assert_eq!(buf.len(), 35);
        assert_eq!(buf[1], TYPE_SHARD);
        assert_eq!(buf[2], 2);
        assert_eq!(buf[3..35], [0x11; 32]);

        assert_eq!(ArchiveHeader::decode(&mut &buf[..]).unwrap(), header);
    }

    #[test]
    fn bad_version_rejected() {
        let buf = [2u8, TYPE_PASSWORD];
        assert!(matches!(
            ArchiveHeader::decode(&mut &buf[..]),
            Err(ArchiveError::InvalidVersion(2))
        ));
    }

    #[test]
    fn unknown_type_rejected() {
        let buf = [VERSION, 9u8];
        assert!(matches!(
            ArchiveHeader::decode(&mut &buf[..]),
            Err(ArchiveError::UnknownType(9))
        ));
    }

    #[test]
    fn truncated_header_is_io_error() {
        let buf = [VERSION, TYPE_CURVE448, 1, 2, 3];
        assert!(matches!(
            ArchiveHeader::decode(&mut &buf[..]),
            Err(ArchiveError::Io(_))
        ));
    }
}
