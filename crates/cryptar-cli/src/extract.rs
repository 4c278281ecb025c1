//! Archive extraction
//!
//! Entries are written as they stream out of the archive; the verify result
//! arrives only after the last entry. Restoring modification times is
//! therefore deferred until verification succeeds, which also keeps
//! directory mtimes correct after their contents are written. An entry that
//! already exists on disk is tolerated, skipped, and logged `-`.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{symlink, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use filetime::FileTime;
use tracing::debug;

use cryptar_archive::{ArchiveError, Volume};

use crate::filter::RegexFilter;

struct Restore {
    path: PathBuf,
    mtime: u64,
    is_symlink: bool,
}

pub fn run<F: Volume>(mut filter: RegexFilter<F>, verbose: u8) -> Result<()> {
    let mut restores: Vec<Restore> = Vec::new();

    while let Some(header) = filter.next_entry()? {
        let path = PathBuf::from(header.path()?.into_owned());
        check_entry_path(&path)?;

        let entry_type = header.entry_type();
        let existed = if entry_type.is_dir() {
            make_dir(&path, header.mode()?)?
        } else if entry_type.is_symlink() {
            let target = header
                .link_name()?
                .with_context(|| format!("symlink entry {} has no target", path.display()))?
                .into_owned();
            make_symlink(&target, &path)?
        } else if entry_type.is_file() {
            write_file(&path, header.mode()?, header.entry_size()?, &mut filter)?
        } else {
            debug!(path = %path.display(), "skipping unsupported entry type");
            continue;
        };

        if verbose > 0 {
            println!("{} {}", if existed { "-" } else { "x" }, path.display());
        }
        if !existed {
            restores.push(Restore {
                path,
                mtime: header.mtime()?,
                is_symlink: entry_type.is_symlink(),
            });
        }
    }

    if !filter.verify()? {
        return Err(ArchiveError::InvalidArchive.into());
    }
    filter.close()?;

    let now = FileTime::now();
    for restore in restores {
        let mtime = FileTime::from_unix_time(restore.mtime as i64, 0);
        let result = if restore.is_symlink {
            filetime::set_symlink_file_times(&restore.path, now, mtime)
        } else {
            filetime::set_file_times(&restore.path, now, mtime)
        };
        result.with_context(|| format!("restoring mtime of {}", restore.path.display()))?;
    }
    Ok(())
}

/// Archives are untrusted input: refuse names that would land outside the
/// working directory.
fn check_entry_path(path: &Path) -> Result<()> {
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        bail!("refusing to extract {}", path.display());
    }
    Ok(())
}

fn make_parents(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}

fn make_dir(path: &Path, mode: u32) -> Result<bool> {
    make_parents(path)?;
    match fs::create_dir(path) {
        Ok(()) => {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
            Ok(false)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(true),
        Err(e) => Err(e).with_context(|| format!("creating directory {}", path.display())),
    }
}

fn make_symlink(target: &Path, path: &Path) -> Result<bool> {
    make_parents(path)?;
    match symlink(target, path) {
        Ok(()) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(true),
        Err(e) => Err(e).with_context(|| format!("creating symlink {}", path.display())),
    }
}

fn write_file<R: Read>(path: &Path, mode: u32, size: u64, body: &mut R) -> Result<bool> {
    make_parents(path)?;
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(true),
        Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
    };

    let copied = io::copy(&mut body.take(size), &mut file)?;
    if copied < size {
        return Err(ArchiveError::ShortCopy.into());
    }
    Ok(false)
}
