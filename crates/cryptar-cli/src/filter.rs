//! Regex selection of archive entries for list and extract

use std::io::{self, Read};

use anyhow::{Context, Result};
use regex::Regex;

use cryptar_archive::{ArchiveReader, ArchiveResult, Volume};

/// Wraps an archive reader and yields only the entries whose names match
/// one of the given patterns. No patterns selects everything.
pub struct RegexFilter<F: Volume> {
    reader: ArchiveReader<F>,
    regex: Regex,
}

impl<F: Volume> RegexFilter<F> {
    pub fn new(reader: ArchiveReader<F>, patterns: &[String]) -> Result<Self> {
        let regex = compile(patterns).context("compiling entry patterns")?;
        Ok(Self { reader, regex })
    }

    /// Next matching entry header, skipping the rest.
    pub fn next_entry(&mut self) -> ArchiveResult<Option<tar::Header>> {
        loop {
            match self.reader.next_entry()? {
                None => return Ok(None),
                Some(header) => {
                    let name = header.path()?.display().to_string();
                    if self.regex.is_match(&name) {
                        return Ok(Some(header));
                    }
                }
            }
        }
    }

    pub fn verify(&mut self) -> ArchiveResult<bool> {
        self.reader.verify()
    }

    pub fn close(self) -> ArchiveResult<()> {
        self.reader.close()
    }
}

impl<F: Volume> Read for RegexFilter<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

fn compile(patterns: &[String]) -> Result<Regex, regex::Error> {
    Regex::new(&patterns.join("|"))
}
