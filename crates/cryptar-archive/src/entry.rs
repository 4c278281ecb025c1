//! Tar entry framing over an opaque byte stream
//!
//! The payload inside an archive is plain ustar: 512-byte headers, bodies
//! padded to the block size, two zero blocks as terminator. The `tar` crate's
//! `Header` does the header byte codec; the body, padding, and terminator
//! handling is managed here so that adding an entry and streaming its body
//! are separate operations, and so reading can hand out one header at a time
//! over a non-seekable stream.
//!
//! GNU/PAX extension entries are not produced or interpreted; names must fit
//! the ustar name+prefix fields.

use std::io::{self, Read, Write};

use crate::error::{ArchiveError, ArchiveResult};

const BLOCK_SIZE: u64 = 512;

fn padding_for(size: u64) -> u64 {
    (BLOCK_SIZE - size % BLOCK_SIZE) % BLOCK_SIZE
}

/// Sum of all header bytes with the checksum field counted as spaces.
fn checksum(block: &[u8; 512]) -> u32 {
    let head: u32 = block[..148].iter().map(|b| *b as u32).sum();
    let tail: u32 = block[156..].iter().map(|b| *b as u32).sum();
    head + tail + 8 * u32::from(b' ')
}

/// Writes tar entries to `out`.
pub struct EntryWriter<W: Write> {
    out: W,
    remaining: u64,
    padding: u64,
}

impl<W: Write> EntryWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            remaining: 0,
            padding: 0,
        }
    }

    /// Write an entry header. The previous entry's body must be complete.
    pub fn add(&mut self, header: &tar::Header) -> ArchiveResult<()> {
        if self.remaining > 0 {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "previous entry body incomplete",
            )));
        }

        self.out.write_all(header.as_bytes())?;
        self.remaining = header.entry_size()?;
        self.padding = padding_for(self.remaining);
        Ok(())
    }

    /// Stream the current entry's body from `body`.
    ///
    /// Copies up to the declared entry size; fewer than `size` bytes from
    /// `body` is a [`ArchiveError::ShortCopy`]. On completion the block
    /// padding is written.
    pub fn copy<R: Read>(&mut self, body: R, size: u64) -> ArchiveResult<()> {
        let copied = io::copy(&mut body.take(self.remaining), &mut self.out)?;
        self.remaining -= copied;
        if copied < size || self.remaining > 0 {
            return Err(ArchiveError::ShortCopy);
        }

        let zeros = [0u8; BLOCK_SIZE as usize];
        self.out.write_all(&zeros[..self.padding as usize])?;
        self.padding = 0;
        Ok(())
    }

    /// Write the terminator blocks and hand back the underlying stream.
    pub fn finish(mut self) -> ArchiveResult<W> {
        if self.remaining > 0 {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "final entry body incomplete",
            )));
        }
        self.out.write_all(&[0u8; 2 * BLOCK_SIZE as usize])?;
        Ok(self.out)
    }
}

/// Reads tar entries from `input`, one at a time.
pub struct EntryReader<R: Read> {
    input: R,
    remaining: u64,
    padding: u64,
    terminated: bool,
}

impl<R: Read> EntryReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            remaining: 0,
            padding: 0,
            terminated: false,
        }
    }

    /// Advance to the next entry header, skipping any unread body bytes.
    /// Returns `None` once the terminator has been consumed.
    pub fn next_entry(&mut self) -> ArchiveResult<Option<tar::Header>> {
        if self.terminated {
            return Ok(None);
        }

        self.skip_current()?;

        let block = self.read_block()?;
        if block.iter().all(|b| *b == 0) {
            let second = self.read_block()?;
            if second.iter().any(|b| *b != 0) {
                return Err(ArchiveError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid tar terminator",
                )));
            }
            self.terminated = true;
            return Ok(None);
        }

        let mut header = tar::Header::new_old();
        header.as_mut_bytes().copy_from_slice(&block);

        if header.cksum()? != checksum(&block) {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "tar header checksum mismatch",
            )));
        }

        self.remaining = header.entry_size()?;
        self.padding = padding_for(self.remaining);
        Ok(Some(header))
    }

    /// True once the terminator has been seen.
    pub fn finished(&self) -> bool {
        self.terminated
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.input
    }

    fn read_block(&mut self) -> ArchiveResult<[u8; 512]> {
        let mut block = [0u8; 512];
        self.input.read_exact(&mut block)?;
        Ok(block)
    }

    fn skip_current(&mut self) -> ArchiveResult<()> {
        let skip = self.remaining + self.padding;
        if skip > 0 {
            let drained = io::copy(&mut (&mut self.input).take(skip), &mut io::sink())?;
            if drained < skip {
                return Err(ArchiveError::Io(io::ErrorKind::UnexpectedEof.into()));
            }
            self.remaining = 0;
            self.padding = 0;
        }
        Ok(())
    }
}

impl<R: Read> Read for EntryReader<R> {
    /// Reads the current entry's body; EOF at the end of each entry.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.remaining == 0 {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.input.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
