pub(crate) mod file;
mod header;
mod rewrite;

pub use file::{
    append_chunk, append_footer, finalize, initialize, load_footer, load_header, read_chunk,
};
pub use header::{FileHeader, FileStatus, FORMAT_VERSION, HEADER_SIZE, MAGIC_NUMBER};
pub use rewrite::{rewrite_metadata, rewrite_metadata_with, BackupPolicy, RewriteOptions};
