//! Byte-level backup and restore of the metadata footer.
//!
//! These operations never decode the footer. A backup is the raw region
//! `[metadata_offset, EOF)` and a restore puts those bytes back and patches
//! the header, so a file whose footer was damaged by an interrupted or
//! buggy rewrite can be recovered.

use crate::container::file::{finalize, read_header};
use crate::error::{OsfError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Copy the footer region of `path` into a new file at `backup_path`.
///
/// Returns the number of bytes copied.
pub fn backup_metablob<P: AsRef<Path>, Q: AsRef<Path>>(path: P, backup_path: Q) -> Result<u64> {
    let mut file = File::open(path.as_ref())?;
    let header = read_header(&mut file)?;
    if !header.is_finished() {
        return Err(OsfError::CorruptHeader(
            "file is not finished, no footer to back up".to_string(),
        ));
    }

    let file_len = file.metadata()?.len();
    if header.metadata_offset > file_len {
        return Err(OsfError::CorruptHeader(format!(
            "metadata offset {} beyond file length {}",
            header.metadata_offset, file_len
        )));
    }

    file.seek(SeekFrom::Start(header.metadata_offset))?;
    let mut backup = File::create(backup_path.as_ref())?;
    let copied = io::copy(&mut file, &mut backup)?;
    backup.flush()?;

    info!(
        path = %path.as_ref().display(),
        backup = %backup_path.as_ref().display(),
        metadata_offset = header.metadata_offset,
        bytes = copied,
        "backed up metadata footer"
    );
    Ok(copied)
}

/// Put a footer backup back onto `path` and finalize the header around it.
///
/// The footer is reinserted at the header-recorded metadata offset when that
/// offset still lies within the file, so anything appended after a
/// truncation is discarded; otherwise the backup goes at the current end of
/// file. The restored bytes are not decoded. Returns the restored file
/// length.
pub fn restore_metablob<P: AsRef<Path>, Q: AsRef<Path>>(path: P, backup_path: Q) -> Result<u64> {
    let mut backup = File::open(backup_path.as_ref())?;
    let backup_len = backup.metadata()?.len();

    let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
    let header = read_header(&mut file)?;
    let current_len = file.metadata()?.len();

    let boundary = if header.is_finished()
        && header.metadata_offset >= header.chunks_offset
        && header.metadata_offset <= current_len
    {
        header.metadata_offset
    } else {
        current_len
    };

    if boundary < current_len {
        warn!(
            boundary,
            discarded = current_len - boundary,
            "discarding bytes after recorded metadata offset"
        );
        file.set_len(boundary)?;
    }

    file.seek(SeekFrom::Start(boundary))?;
    let copied = io::copy(&mut backup, &mut file)?;
    file.flush()?;
    drop(file);

    if copied != backup_len {
        return Err(OsfError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("backup changed while restoring: {} of {} bytes", copied, backup_len),
        )));
    }
    debug!(boundary, bytes = copied, "appended footer backup");

    finalize(path.as_ref(), boundary, copied)?;
    let restored_len = boundary + copied;

    info!(
        path = %path.as_ref().display(),
        backup = %backup_path.as_ref().display(),
        file_size = restored_len,
        "restored metadata footer"
    );
    Ok(restored_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{append_footer, initialize, load_footer};
    use crate::metadata::{Directory, SensorInfo};

    fn finished_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("test.osf");
        initialize(&path).unwrap();
        let mut directory = Directory::new("backup-test");
        directory.add_entry(SensorInfo::default());
        append_footer(&path, &directory).unwrap();
        path
    }

    #[test]
    fn test_backup_copies_footer_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = finished_file(dir.path());
        let backup = dir.path().join("footer.bak");

        let copied = backup_metablob(&path, &backup).unwrap();
        let (header, _) = load_footer(&path).unwrap();

        assert_eq!(copied, header.metadata_size);
        let original = std::fs::read(&path).unwrap();
        assert_eq!(
            std::fs::read(&backup).unwrap(),
            &original[header.metadata_offset as usize..]
        );
    }

    #[test]
    fn test_backup_of_incomplete_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incomplete.osf");
        initialize(&path).unwrap();

        assert!(matches!(
            backup_metablob(&path, dir.path().join("x.bak")),
            Err(OsfError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_restore_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = finished_file(dir.path());
        let backup = dir.path().join("footer.bak");
        let original = std::fs::read(&path).unwrap();

        let copied = backup_metablob(&path, &backup).unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(original.len() as u64 - copied).unwrap();
        drop(file);

        let restored_len = restore_metablob(&path, &backup).unwrap();
        assert_eq!(restored_len, original.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_restore_missing_backup_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = finished_file(dir.path());
        assert!(matches!(
            restore_metablob(&path, dir.path().join("nope.bak")),
            Err(OsfError::Io(_))
        ));
    }
}
