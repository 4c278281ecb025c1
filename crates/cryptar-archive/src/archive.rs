//! Archive reader/writer handles and the deferred tag patch
//!
//! Mode drivers write their outer header, then hand their open file(s) to
//! [`ArchiveWriter::create`] / [`ArchiveReader::open`]. The writer records
//! the byte offset of the reserved tag slot before the pipeline starts; on
//! close it finalizes the pipeline, seeks every output file back to that
//! offset, and patches the real tag in. Shard mode multiplexes one pipeline
//! to all output files, so the tag, nonce, and ciphertext are byte-identical
//! in each.

use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use tracing::debug;

use cryptar_crypto::DataKey;

use crate::error::{ArchiveError, ArchiveResult};
use crate::stream::{self, InnerReader, InnerWriter};

/// Capabilities the archive layer needs from an underlying file: sequential
/// read/write plus seek for the tag patch and the pre-verify rewind. Tests
/// use `&mut Cursor<Vec<u8>>`, production uses `std::fs::File`.
pub trait Volume: Read + Write + Seek {}

impl<T: Read + Write + Seek> Volume for T {}

/// Writes every byte to every file, in order. A slow file stalls them all;
/// that is the accepted cost of keeping each shard a standalone archive.
pub(crate) struct MultiSink<F: Volume> {
    files: Vec<F>,
}

impl<F: Volume> MultiSink<F> {
    fn new(files: Vec<F>) -> Self {
        Self { files }
    }

    fn into_files(self) -> Vec<F> {
        self.files
    }
}

impl<F: Volume> Write for MultiSink<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for file in &mut self.files {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for file in &mut self.files {
            file.flush()?;
        }
        Ok(())
    }
}

/// Write handle over one or more output files.
pub struct ArchiveWriter<F: Volume> {
    inner: InnerWriter<BufWriter<MultiSink<F>>>,
    tag_offset: u64,
}

impl<F: Volume> ArchiveWriter<F> {
    /// `files` must all be positioned just past their outer headers; the
    /// reserved tag slot lands at the current offset of the first file (all
    /// headers of one archive have the same length, so the offset is shared).
    pub(crate) fn create(mut files: Vec<F>, key: &DataKey) -> ArchiveResult<Self> {
        let first = files.first_mut().ok_or_else(|| {
            ArchiveError::Io(io::Error::new(io::ErrorKind::InvalidInput, "no output files"))
        })?;
        let tag_offset = first.stream_position()?;
        let sink = BufWriter::new(MultiSink::new(files));
        let inner = InnerWriter::create(sink, key)?;
        Ok(Self { inner, tag_offset })
    }

    /// Append an entry header to the archive.
    pub fn add_entry(&mut self, header: &tar::Header) -> ArchiveResult<()> {
        self.inner.add(header)
    }

    /// Stream the current entry's body. Fewer than `size` bytes is a
    /// [`ArchiveError::ShortCopy`].
    pub fn copy_body<R: Read>(&mut self, body: R, size: u64) -> ArchiveResult<()> {
        self.inner.copy(body, size)
    }

    /// Finalize the pipeline, patch the tag into every output file, flush,
    /// and close the files in order. An I/O error mid-patch leaves the
    /// output unverifiable; nothing is unlinked here.
    pub fn close(self) -> ArchiveResult<()> {
        let (tag, sink) = self.inner.finish()?;
        let multi = sink
            .into_inner()
            .map_err(|e| ArchiveError::Io(e.into_error()))?;

        let mut files = multi.into_files();
        for file in &mut files {
            file.seek(SeekFrom::Start(self.tag_offset))?;
            file.write_all(&tag)?;
            file.flush()?;
        }
        debug!(
            files = files.len(),
            offset = self.tag_offset,
            "authentication tag patched"
        );
        Ok(())
    }
}

/// Read handle over a pre-verified archive.
pub struct ArchiveReader<F: Volume> {
    inner: InnerReader<BufReader<F>>,
    // Co-shard files stay open for the reader's lifetime and close with it.
    companions: Vec<F>,
}

impl<F: Volume> ArchiveReader<F> {
    /// Run the verify-only scan over `file` from its current position, then
    /// rewind and stand up the streaming reader. A tag mismatch is
    /// [`ArchiveError::InvalidArchive`]; no plaintext escapes in that case.
    pub(crate) fn open(mut file: F, companions: Vec<F>, key: &DataKey) -> ArchiveResult<Self> {
        let payload_start = file.stream_position()?;
        if !stream::verify(BufReader::new(&mut file), key)? {
            return Err(ArchiveError::InvalidArchive);
        }
        file.seek(SeekFrom::Start(payload_start))?;
        debug!(offset = payload_start, "archive pre-verified");

        let inner = InnerReader::open(BufReader::new(file), key)?;
        Ok(Self { inner, companions })
    }

    /// Next entry header, or `None` at the end of the archive.
    pub fn next_entry(&mut self) -> ArchiveResult<Option<tar::Header>> {
        self.inner.next_entry()
    }

    /// True iff the stream is exhausted and the tag matches.
    pub fn verify(&mut self) -> ArchiveResult<bool> {
        self.inner.verify()
    }

    /// Close the archive and any co-shard files.
    pub fn close(self) -> ArchiveResult<()> {
        drop(self.inner);
        drop(self.companions);
        Ok(())
    }
}

impl<F: Volume> Read for ArchiveReader<F> {
    /// Reads the current entry's body.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
