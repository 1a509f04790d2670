use crate::backup::{backup_metablob, restore_metablob};
use crate::container::file::{append_encoded_footer, load_footer};
use crate::error::{OsfError, Result};
use crate::metadata::{BinaryFooterCodec, EntryPayload, FooterCodec};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Where `rewrite_metadata_with` keeps a copy of the old footer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackupPolicy {
    /// No backup is taken
    #[default]
    None,
    /// Back up to the given path and leave the file there afterwards
    Keep(PathBuf),
    /// Back up to a temporary file next to the target, removed afterwards
    Scratch,
}

/// Options for a metadata rewrite
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    backup: BackupPolicy,
    sync: bool,
}

impl RewriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a footer backup before truncating; it is restored if the rewrite fails
    pub fn with_backup(mut self, policy: BackupPolicy) -> Self {
        self.backup = policy;
        self
    }

    /// fsync the file once the new header is in place
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn backup(&self) -> &BackupPolicy {
        &self.backup
    }
}

/// Append `new_entries` to the footer of a finished file.
///
/// The current footer is loaded and CRC-verified, the file is cut back to
/// the metadata offset and a new footer with the old entries followed by the
/// new ones is appended. Chunks are untouched. Returns the new footer size.
pub fn rewrite_metadata<P, I, E>(path: P, new_entries: I) -> Result<u64>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = E>,
    E: Into<EntryPayload>,
{
    rewrite_metadata_with(path, new_entries, &RewriteOptions::default())
}

/// [`rewrite_metadata`] with a backup policy and sync control
pub fn rewrite_metadata_with<P, I, E>(path: P, new_entries: I, options: &RewriteOptions) -> Result<u64>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = E>,
    E: Into<EntryPayload>,
{
    let path = path.as_ref();

    // Refuse to touch a file whose footer does not verify
    let (header, mut directory) = load_footer(path)?;
    let existing = directory.entries.len();
    for entry in new_entries {
        directory.add_entry(entry);
    }
    let added = directory.entries.len() - existing;

    // Encode before anything on disk changes so bad entries leave the file intact
    let encoded = BinaryFooterCodec.encode(&directory)?;

    let written = apply_rewrite(path, header.metadata_offset, options, |path| {
        append_encoded_footer(path, &encoded)
    })?;

    info!(
        path = %path.display(),
        preserved = existing,
        added,
        footer_size = written,
        "rewrote metadata footer"
    );
    Ok(written)
}

/// Back up per `options`, truncate to `metadata_offset` and run `append`.
///
/// When `append` or the truncation fails and a backup was taken, the old
/// footer is restored and the original error returned.
pub(crate) fn apply_rewrite<F>(
    path: &Path,
    metadata_offset: u64,
    options: &RewriteOptions,
    append: F,
) -> Result<u64>
where
    F: FnOnce(&Path) -> Result<u64>,
{
    // Keeps a scratch backup alive until the rewrite is over
    let mut _scratch = None;
    let backup_path = match &options.backup {
        BackupPolicy::None => None,
        BackupPolicy::Keep(backup_path) => {
            backup_metablob(path, backup_path)?;
            Some(backup_path.clone())
        }
        BackupPolicy::Scratch => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let scratch = NamedTempFile::new_in(dir)?;
            backup_metablob(path, scratch.path())?;
            let scratch_path = scratch.path().to_path_buf();
            _scratch = Some(scratch);
            Some(scratch_path)
        }
    };

    let result = truncate_and_append(path, metadata_offset, append, options.sync);

    if let (Err(err), Some(backup_path)) = (&result, backup_path) {
        warn!(error = %err, "metadata rewrite failed, restoring footer backup");
        if let Err(restore_err) = restore_metablob(path, &backup_path) {
            warn!(
                error = %restore_err,
                backup = %backup_path.display(),
                "footer restore failed, file left without a valid footer"
            );
        }
    }
    result
}

fn truncate_and_append<F>(path: &Path, metadata_offset: u64, append: F, sync: bool) -> Result<u64>
where
    F: FnOnce(&Path) -> Result<u64>,
{
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(metadata_offset)?;
    file.sync_data()?;
    drop(file);
    debug!(metadata_offset, "truncated old footer");

    let written = append(path)?;

    if sync {
        OpenOptions::new()
            .write(true)
            .open(path)
            .and_then(|f| f.sync_all())
            .map_err(OsfError::from)?;
    }
    Ok(written)
}
