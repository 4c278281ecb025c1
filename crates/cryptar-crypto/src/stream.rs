//! Streaming XChaCha20-Poly1305 with a deferred tag
//!
//! The one-shot AEAD API wants the whole message in memory; an archive does
//! not fit. This module composes the `chacha20` and `poly1305` crates into
//! the RFC 8439 construction (XChaCha20 nonce extension, empty AAD) so the
//! payload can be encrypted and authenticated as it streams:
//!
//! - the Poly1305 key is taken from keystream block 0, data starts at block 1
//! - the MAC absorbs ciphertext incrementally, buffering partial 16-byte
//!   blocks between calls
//! - finalization appends the zero-padding and LE length block
//!   (aad_len = 0 || ciphertext_len)
//!
//! [`StreamCipher::tag`] does not consume the state, so a writer can take the
//! tag after the last byte and a reader can compare tags after draining.

use chacha20::cipher::{KeyIvInit, StreamCipher as _};
use chacha20::XChaCha20;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::{Block, Key, Poly1305};
use std::io::{self, Read, Write};
use zeroize::Zeroize;

use crate::{DataKey, NONCE_SIZE, TAG_SIZE};

const BLOCK_SIZE: usize = 16;

/// XChaCha20-Poly1305 state for one direction of one archive.
///
/// Encrypt-then-MAC on write, MAC-then-decrypt on read; the tag covers the
/// ciphertext only (the associated data is empty).
pub struct StreamCipher {
    cipher: XChaCha20,
    mac: Poly1305,
    pending: [u8; BLOCK_SIZE],
    pending_len: usize,
    ciphertext_len: u64,
}

impl StreamCipher {
    pub fn new(key: &DataKey, nonce: &[u8; NONCE_SIZE]) -> Self {
        let mut cipher = XChaCha20::new(key.as_bytes().into(), nonce.into());

        // Block 0 of the keystream keys the MAC; payload starts at block 1.
        let mut block0 = [0u8; 64];
        cipher.apply_keystream(&mut block0);
        let mac = Poly1305::new(Key::from_slice(&block0[..32]));
        block0.zeroize();

        Self {
            cipher,
            mac,
            pending: [0u8; BLOCK_SIZE],
            pending_len: 0,
            ciphertext_len: 0,
        }
    }

    /// Encrypt `data` in place and absorb the resulting ciphertext.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
        self.absorb(data);
    }

    /// Absorb `data` as ciphertext, then decrypt it in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        self.absorb(data);
        self.cipher.apply_keystream(data);
    }

    fn absorb(&mut self, mut ciphertext: &[u8]) {
        self.ciphertext_len += ciphertext.len() as u64;

        if self.pending_len > 0 {
            let take = (BLOCK_SIZE - self.pending_len).min(ciphertext.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&ciphertext[..take]);
            self.pending_len += take;
            ciphertext = &ciphertext[take..];

            if self.pending_len < BLOCK_SIZE {
                return;
            }
            let block = self.pending;
            self.mac.update(std::slice::from_ref(Block::from_slice(&block)));
            self.pending_len = 0;
        }

        let mut chunks = ciphertext.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            self.mac.update(std::slice::from_ref(Block::from_slice(chunk)));
        }

        let rest = chunks.remainder();
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Compute the Poly1305 tag over everything absorbed so far.
    pub fn tag(&self) -> [u8; TAG_SIZE] {
        let mut mac = self.mac.clone();

        if self.pending_len > 0 {
            let mut block = [0u8; BLOCK_SIZE];
            block[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
            mac.update(std::slice::from_ref(Block::from_slice(&block)));
        }

        // aad_len (always 0) || ciphertext_len, both little-endian
        let mut lengths = [0u8; BLOCK_SIZE];
        lengths[8..].copy_from_slice(&self.ciphertext_len.to_le_bytes());
        mac.update(std::slice::from_ref(Block::from_slice(&lengths)));

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(mac.finalize().as_slice());
        tag
    }
}

/// Encrypting adapter: plaintext written in, ciphertext written out.
pub struct CipherWriter<W: Write> {
    inner: W,
    cipher: StreamCipher,
    scratch: Vec<u8>,
}

impl<W: Write> CipherWriter<W> {
    pub fn new(inner: W, cipher: StreamCipher) -> Self {
        Self {
            inner,
            cipher,
            scratch: Vec::new(),
        }
    }

    /// Final tag and the underlying sink.
    pub fn finish(mut self) -> ([u8; TAG_SIZE], W) {
        self.scratch.zeroize();
        (self.cipher.tag(), self.inner)
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.encrypt(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypting adapter: ciphertext read from the source, plaintext read out.
pub struct CipherReader<R: Read> {
    inner: R,
    cipher: StreamCipher,
}

impl<R: Read> CipherReader<R> {
    pub fn new(inner: R, cipher: StreamCipher) -> Self {
        Self { inner, cipher }
    }

    pub fn cipher(&self) -> &StreamCipher {
        &self.cipher
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.decrypt(&mut buf[..n]);
        Ok(n)
    }
}
