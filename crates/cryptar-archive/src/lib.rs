//! cryptar-archive: the container layer behind the `cryptar` tool
//!
//! An archive is one or more opaque files holding a gzip-compressed tar
//! stream, encrypted and authenticated end-to-end:
//!
//! ```text
//! [outer header: mode-specific key material]
//! [16 bytes: Poly1305 tag, patched in on close]
//! [24 bytes: nonce]
//! [XChaCha20-Poly1305( gzip( tar entries ) )]
//! ```
//!
//! Three mutually exclusive modes establish the data key: [`PasswordArchive`]
//! (Argon2d), [`Curve448Archive`] (X448 + BLAKE2b), and [`ShardArchive`]
//! (random key, Shamir (n,k)-split, one file per share carrying the full
//! ciphertext). [`KeyContainer`] persists X448 points for the curve mode.
//!
//! Readers never expose plaintext from an unauthenticated archive: every
//! mode driver runs a full verify scan before returning entries.

pub mod archive;
pub mod container;
pub mod error;
pub mod header;
pub mod modes;
pub mod stream;
pub mod wire;

mod entry;

pub use archive::{ArchiveReader, ArchiveWriter, Volume};
pub use container::KeyContainer;
pub use error::{ArchiveError, ArchiveResult};
pub use header::{ArchiveHeader, Curve448Header, PasswordHeader, ShardHeader, SALT_SIZE, VERSION};
pub use modes::{Archive, Curve448Archive, PasswordArchive, ShardArchive};
