//! Archive creation: consume scanner entries, stream bodies

use std::fs::File;

use anyhow::{Context, Result};

use cryptar_archive::{ArchiveWriter, Volume};

use crate::scan;

pub fn run<F: Volume>(mut writer: ArchiveWriter<F>, names: &[String], verbose: u8) -> Result<()> {
    for item in scan::scan(names) {
        let entry = item.context("scanning input")?;
        let size = entry.header.entry_size()?;

        writer.add_entry(&entry.header)?;

        if entry.header.entry_type().is_file() {
            let body = File::open(&entry.path)
                .with_context(|| format!("opening {}", entry.path.display()))?;
            writer
                .copy_body(body, size)
                .with_context(|| format!("archiving {}", entry.path.display()))?;
        }

        if verbose > 0 {
            println!("a {}", entry.path.display());
        }
    }

    writer.close().context("finalizing archive")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptar_archive::{Archive, PasswordArchive};
    use secrecy::SecretString;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    #[test]
    fn creates_archive_from_directory_tree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"alpha").unwrap();
        std::fs::write(root.join("b.txt"), b"bravo!").unwrap();

        let password = || SecretString::from("pw".to_string());
        let mut buf = Cursor::new(Vec::new());

        let writer = Archive::Password(PasswordArchive::new(password(), 1, 8, &mut buf))
            .writer()
            .unwrap();
        run(writer, &[root.display().to_string()], 0).unwrap();

        buf.set_position(0);
        let mut reader = Archive::Password(PasswordArchive::new(password(), 1, 8, &mut buf))
            .reader()
            .unwrap();

        let mut seen = Vec::new();
        while let Some(header) = reader.next_entry().unwrap() {
            let name = header.path().unwrap().display().to_string();
            let mut body = Vec::new();
            reader.read_to_end(&mut body).unwrap();
            seen.push((name, body));
        }
        assert!(reader.verify().unwrap());

        seen.sort();
        assert_eq!(seen.len(), 3, "directory plus two files");
        assert_eq!(seen[1].1, b"alpha");
        assert_eq!(seen[2].1, b"bravo!");
    }

    #[test]
    fn missing_input_fails() {
        let tmp = TempDir::new().unwrap();
        let mut buf = Cursor::new(Vec::new());
        let writer = Archive::Password(PasswordArchive::new(
            SecretString::from("pw".to_string()),
            1,
            8,
            &mut buf,
        ))
        .writer()
        .unwrap();

        let missing = tmp.path().join("absent").display().to_string();
        assert!(run(writer, &[missing], 0).is_err());
    }
}
