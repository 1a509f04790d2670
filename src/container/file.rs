use crate::container::header::{FileHeader, FileStatus, HEADER_SIZE};
use crate::crc::{self, CRC_BYTES_SIZE};
use crate::error::{OsfError, Result};
use crate::metadata::{BinaryFooterCodec, ChunkOffset, Directory, FooterCodec};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Create a new OSF file with an incomplete header.
///
/// Returns the header size, which is where the chunk region begins.
pub fn initialize<P: AsRef<Path>>(path: P) -> Result<u64> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path.as_ref())?;

    FileHeader::new().write_to(&mut file)?;
    file.flush()?;

    debug!(path = %path.as_ref().display(), header_size = HEADER_SIZE, "initialized OSF file");
    Ok(HEADER_SIZE as u64)
}

/// Append one chunk (`data` followed by its CRC) to an unfinished file
pub fn append_chunk<P: AsRef<Path>>(
    path: P,
    data: &[u8],
    start_ts: u64,
    end_ts: u64,
) -> Result<ChunkOffset> {
    let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
    let header = read_header(&mut file)?;
    if header.status != FileStatus::Incomplete {
        return Err(OsfError::AlreadyFinished);
    }

    let offset = file.seek(SeekFrom::End(0))?;
    let length = crc::write_blob(&mut file, data)?;
    file.flush()?;

    debug!(offset, length, start_ts, end_ts, "appended chunk");
    Ok(ChunkOffset {
        start_ts,
        end_ts,
        offset,
        length,
    })
}

/// Read a chunk's payload back, verifying its CRC
pub fn read_chunk<P: AsRef<Path>>(path: P, chunk: &ChunkOffset) -> Result<Vec<u8>> {
    let mut file = File::open(path.as_ref())?;
    let file_len = file.metadata()?.len();

    let end = chunk.offset.checked_add(chunk.length);
    if chunk.offset < HEADER_SIZE as u64
        || chunk.length < CRC_BYTES_SIZE as u64
        || end.map_or(true, |end| end > file_len)
    {
        return Err(OsfError::CorruptFooter(format!(
            "chunk [{} + {}] outside file of {} bytes",
            chunk.offset, chunk.length, file_len
        )));
    }

    file.seek(SeekFrom::Start(chunk.offset))?;
    let mut blob = vec![0u8; chunk.length as usize];
    file.read_exact(&mut blob)?;

    let payload_len = crc::split_verified(&blob)?.len();
    blob.truncate(payload_len);
    Ok(blob)
}

/// Patch the header to record the footer location and mark the file finished.
///
/// This is a single fixed-size write at offset 0. The file length is checked
/// before and after the patch. Returns the header size.
pub fn finalize<P: AsRef<Path>>(path: P, metadata_offset: u64, metadata_saved_size: u64) -> Result<u64> {
    let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
    let len_before = file.metadata()?.len();

    let mut header = read_header(&mut file)?;

    if metadata_offset < header.chunks_offset {
        return Err(OsfError::CorruptHeader(format!(
            "metadata offset {} lies before chunk region at {}",
            metadata_offset, header.chunks_offset
        )));
    }
    if metadata_offset.checked_add(metadata_saved_size) != Some(len_before) {
        return Err(OsfError::CorruptHeader(format!(
            "footer [{} + {}] does not end at file length {}",
            metadata_offset, metadata_saved_size, len_before
        )));
    }

    header.status = FileStatus::Finished;
    header.metadata_offset = metadata_offset;
    header.metadata_size = metadata_saved_size;
    header.file_size = len_before;

    file.seek(SeekFrom::Start(0))?;
    header.write_to(&mut file)?;
    file.flush()?;

    let len_after = file.metadata()?.len();
    if len_after != len_before {
        return Err(OsfError::CorruptHeader(format!(
            "file length changed from {} to {} during header patch",
            len_before, len_after
        )));
    }

    debug!(metadata_offset, metadata_saved_size, file_size = len_after, "finalized header");
    Ok(HEADER_SIZE as u64)
}

/// Serialize `directory`, append it with its CRC at end-of-file and finalize.
///
/// Used both for the first footer and for every rewrite. Returns the number
/// of footer bytes written, CRC included.
pub fn append_footer<P: AsRef<Path>>(path: P, directory: &Directory) -> Result<u64> {
    let encoded = BinaryFooterCodec.encode(directory)?;
    append_encoded_footer(path, &encoded)
}

/// Append already-encoded footer bytes plus CRC and finalize
pub(crate) fn append_encoded_footer<P: AsRef<Path>>(path: P, encoded: &[u8]) -> Result<u64> {
    let metadata_offset;
    let written;
    {
        let mut file = OpenOptions::new().write(true).open(path.as_ref())?;
        metadata_offset = file.seek(SeekFrom::End(0))?;
        written = crc::write_blob(&mut file, encoded)?;
        file.flush()?;
    }

    debug!(metadata_offset, written, "appended footer");
    finalize(path, metadata_offset, written)?;
    Ok(written)
}

/// Read and validate the header of an OSF file
pub fn load_header<P: AsRef<Path>>(path: P) -> Result<FileHeader> {
    let mut file = File::open(path.as_ref())?;
    read_header(&mut file)
}

/// Load the header and the CRC-verified, decoded footer of a finished file
pub fn load_footer<P: AsRef<Path>>(path: P) -> Result<(FileHeader, Directory)> {
    let mut file = File::open(path.as_ref())?;
    let header = read_header(&mut file)?;

    if !header.is_finished() {
        return Err(OsfError::Incomplete);
    }
    header.validate_layout(file.metadata()?.len())?;

    let blob = read_region(&mut file, header.metadata_offset, header.metadata_size)?;
    let encoded = crc::split_verified(&blob)?;
    let directory = BinaryFooterCodec.decode(encoded)?;

    Ok((header, directory))
}

/// Read the header from an open file, rejecting files shorter than a header
pub(crate) fn read_header(file: &mut File) -> Result<FileHeader> {
    let file_len = file.metadata()?.len();
    if file_len < HEADER_SIZE as u64 {
        return Err(OsfError::CorruptHeader(format!(
            "file of {} bytes is shorter than the {} byte header",
            file_len, HEADER_SIZE
        )));
    }

    file.seek(SeekFrom::Start(0))?;
    FileHeader::read_from(&mut *file)
}

fn read_region(file: &mut File, offset: u64, size: u64) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(size as usize);
    file.take(size).read_to_end(&mut buf)?;
    if buf.len() as u64 != size {
        return Err(OsfError::CorruptFooter(format!(
            "expected {} footer bytes, read {}",
            size,
            buf.len()
        )));
    }
    Ok(buf)
}
