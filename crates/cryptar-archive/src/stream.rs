//! The inner archive pipeline
//!
//! Layout after the outer header, identical for every mode:
//!
//! ```text
//! [16 bytes: Poly1305 tag][24 bytes: nonce][gzip(tar entries), encrypted]
//! ```
//!
//! The tag slot is written as zeros at creation because the tag is only known
//! after the last ciphertext byte; the archive writer patches it in on close.
//! Reading therefore proceeds tag-first: [`verify`] decrypts and discards the
//! whole payload and compares tags in constant time, and every mode driver
//! runs it before handing out a reader.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::RngCore;
use subtle::ConstantTimeEq;

use cryptar_crypto::{CipherReader, CipherWriter, DataKey, StreamCipher, NONCE_SIZE, TAG_SIZE};

use crate::entry::{EntryReader, EntryWriter};
use crate::error::ArchiveResult;

/// Streams entries into the encrypted, compressed payload.
pub struct InnerWriter<W: Write> {
    entries: EntryWriter<GzEncoder<CipherWriter<W>>>,
}

impl<W: Write> InnerWriter<W> {
    /// Reserve the tag slot, write a fresh nonce, and stand up the
    /// tar → gzip → cipher stack over `sink`.
    pub fn create(mut sink: W, key: &DataKey) -> ArchiveResult<Self> {
        sink.write_all(&[0u8; TAG_SIZE])?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        sink.write_all(&nonce)?;

        let cipher = CipherWriter::new(sink, StreamCipher::new(key, &nonce));
        let compressor = GzEncoder::new(cipher, Compression::default());
        Ok(Self {
            entries: EntryWriter::new(compressor),
        })
    }

    pub fn add(&mut self, header: &tar::Header) -> ArchiveResult<()> {
        self.entries.add(header)
    }

    pub fn copy<R: Read>(&mut self, body: R, size: u64) -> ArchiveResult<()> {
        self.entries.copy(body, size)
    }

    /// Close the tar stream and the compressor, then return the final tag
    /// and the underlying sink. The tag is NOT written to the stream; the
    /// caller patches it into the reserved slot.
    pub fn finish(self) -> ArchiveResult<([u8; TAG_SIZE], W)> {
        let compressor = self.entries.finish()?;
        let cipher = compressor.finish()?;
        let (tag, sink) = cipher.finish();
        Ok((tag, sink))
    }
}

/// Streams entries out of the encrypted, compressed payload.
pub struct InnerReader<R: Read> {
    entries: EntryReader<GzDecoder<CipherReader<R>>>,
    expected_tag: [u8; TAG_SIZE],
}

impl<R: Read> InnerReader<R> {
    pub fn open(mut source: R, key: &DataKey) -> ArchiveResult<Self> {
        let mut expected_tag = [0u8; TAG_SIZE];
        source.read_exact(&mut expected_tag)?;

        let mut nonce = [0u8; NONCE_SIZE];
        source.read_exact(&mut nonce)?;

        let cipher = CipherReader::new(source, StreamCipher::new(key, &nonce));
        let decompressor = GzDecoder::new(cipher);
        Ok(Self {
            entries: EntryReader::new(decompressor),
            expected_tag,
        })
    }

    pub fn next_entry(&mut self) -> ArchiveResult<Option<tar::Header>> {
        self.entries.next_entry()
    }

    /// Compare the computed tag against the expected one, in constant time.
    ///
    /// Only meaningful once every entry has been consumed; before that the
    /// stream is not exhausted and this returns false. Draining pulls the
    /// gzip trailer and any remaining ciphertext through the cipher so the
    /// computed tag covers the entire payload.
    pub fn verify(&mut self) -> ArchiveResult<bool> {
        if !self.entries.finished() {
            return Ok(false);
        }

        let decompressor = self.entries.get_mut();
        io::copy(&mut *decompressor, &mut io::sink())?;
        io::copy(&mut *decompressor.get_mut(), &mut io::sink())?;

        let tag = decompressor.get_ref().cipher().tag();
        Ok(bool::from(tag[..].ct_eq(&self.expected_tag)))
    }
}

impl<R: Read> Read for InnerReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.entries.read(buf)
    }
}

/// The verify-only scan: decrypt and discard the payload from the current
/// position to EOF, then compare tags in constant time. This is the trust
/// anchor that gates creation of every reader.
pub fn verify<R: Read>(mut source: R, key: &DataKey) -> ArchiveResult<bool> {
    let mut expected_tag = [0u8; TAG_SIZE];
    source.read_exact(&mut expected_tag)?;

    let mut nonce = [0u8; NONCE_SIZE];
    source.read_exact(&mut nonce)?;

    let mut reader = CipherReader::new(source, StreamCipher::new(key, &nonce));
    io::copy(&mut reader, &mut io::sink())?;

    Ok(bool::from(reader.cipher().tag()[..].ct_eq(&expected_tag)))
}
