//! Filesystem walker feeding archive creation
//!
//! A scanner thread walks the named paths and emits one tar header per
//! entry over a bounded channel; the consuming thread streams bodies
//! through the archive pipeline at its own pace, with backpressure from the
//! channel. Regular files, directories, and symlinks are archived; devices,
//! sockets, and the rest are skipped. Entries are emitted as discovered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use tracing::debug;

/// One entry discovered by the scanner: the finished tar header and the
/// path to open for its body.
pub struct ScanEntry {
    pub header: tar::Header,
    pub path: PathBuf,
}

const CHANNEL_CAPACITY: usize = 64;

/// Walk `names` on a background thread. The receiver yields entries in
/// discovery order; a walk error arrives in-band and ends the stream.
pub fn scan(names: &[String]) -> Receiver<io::Result<ScanEntry>> {
    let (tx, rx) = mpsc::sync_channel(CHANNEL_CAPACITY);
    let names: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();

    thread::spawn(move || {
        for name in &names {
            match walk(name, &tx) {
                Ok(()) => {}
                // Receiver hung up; nothing left to report to.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    });

    rx
}

fn walk(path: &Path, tx: &SyncSender<io::Result<ScanEntry>>) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let file_type = meta.file_type();

    if !file_type.is_file() && !file_type.is_dir() && !file_type.is_symlink() {
        debug!(path = %path.display(), "skipping special file");
        return Ok(());
    }

    let mut header = tar::Header::new_ustar();
    header.set_metadata(&meta);
    // Archive member names are relative, like GNU tar's leading-slash strip.
    header.set_path(path.strip_prefix("/").unwrap_or(path))?;
    if file_type.is_symlink() {
        let target = fs::read_link(path)?;
        header.set_link_name(&target)?;
        header.set_size(0);
    }
    header.set_cksum();

    let entry = ScanEntry {
        header,
        path: path.to_path_buf(),
    };
    if tx.send(Ok(entry)).is_err() {
        return Err(io::ErrorKind::BrokenPipe.into());
    }

    if file_type.is_dir() {
        for child in fs::read_dir(path)? {
            walk(&child?.path(), tx)?;
        }
    }
    Ok(())
}
