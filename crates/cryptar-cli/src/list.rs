//! Archive listing

use anyhow::{bail, Result};
use chrono::DateTime;

use cryptar_archive::{ArchiveError, Volume};

use crate::bytesize::ByteSize;
use crate::filter::RegexFilter;

pub fn run<F: Volume>(mut filter: RegexFilter<F>, verbose: u8) -> Result<()> {
    let mut matches = 0usize;

    while let Some(header) = filter.next_entry()? {
        if verbose > 0 {
            println!("{}", long_format(&header)?);
        } else {
            println!("{}", header.path()?.display());
        }
        matches += 1;
    }

    if !filter.verify()? {
        return Err(ArchiveError::InvalidArchive.into());
    }
    filter.close()?;

    if matches == 0 {
        bail!("no entry found");
    }
    Ok(())
}

/// `drwxr-xr-x  1000   1000      4.00K 2016-03-01 09:15  src -> target`
fn long_format(header: &tar::Header) -> Result<String> {
    let mode = mode_string(header)?;
    let uid = header.uid()?;
    let gid = header.gid()?;

    let size = match header.entry_size()? {
        0 => "0".to_string(),
        n => ByteSize(n).to_string(),
    };

    let date = DateTime::from_timestamp(header.mtime()? as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let mut name = header.path()?.display().to_string();
    if header.entry_type().is_symlink() {
        if let Some(target) = header.link_name()? {
            name = format!("{name} -> {}", target.display());
        }
    }

    Ok(format!("{mode}  {uid:<6} {gid:<6} {size:>8} {date}  {name}"))
}

fn mode_string(header: &tar::Header) -> Result<String> {
    let entry_type = header.entry_type();
    let kind = if entry_type.is_dir() {
        'd'
    } else if entry_type.is_symlink() {
        'l'
    } else {
        '-'
    };

    let mode = header.mode()?;
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    Ok(out)
}
