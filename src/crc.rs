//! CRC32 integrity trailer shared by every blob written into an OSF file.
//!
//! A protected blob is stored as `[payload][crc32(payload) as u32 LE]`.

use crate::error::{OsfError, Result};
use std::io::Write;

/// Size of the CRC trailer in bytes
pub const CRC_BYTES_SIZE: usize = 4;

/// Compute the CRC32 (IEEE) of a buffer
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Append the CRC32 of the current contents to the buffer
pub fn append_checksum(buf: &mut Vec<u8>) {
    let crc = checksum(buf);
    buf.extend_from_slice(&crc.to_le_bytes());
}

/// Check a `payload ++ crc` buffer
pub fn verify(bytes_with_trailer: &[u8]) -> bool {
    split_verified(bytes_with_trailer).is_ok()
}

/// Verify the trailer and return the payload part.
pub fn split_verified(bytes_with_trailer: &[u8]) -> Result<&[u8]> {
    if bytes_with_trailer.len() < CRC_BYTES_SIZE {
        return Err(OsfError::CorruptFooter(format!(
            "blob of {} bytes is too short to carry a CRC trailer",
            bytes_with_trailer.len()
        )));
    }

    let (payload, trailer) = bytes_with_trailer.split_at(bytes_with_trailer.len() - CRC_BYTES_SIZE);
    let mut stored = [0u8; CRC_BYTES_SIZE];
    stored.copy_from_slice(trailer);
    let expected = u32::from_le_bytes(stored);
    let actual = checksum(payload);

    if expected != actual {
        return Err(OsfError::ChecksumMismatch { expected, actual });
    }

    Ok(payload)
}

/// Write `payload` followed by its CRC, returning the total bytes written
pub fn write_blob<W: Write>(mut writer: W, payload: &[u8]) -> Result<u64> {
    writer.write_all(payload)?;
    writer.write_all(&checksum(payload).to_le_bytes())?;
    Ok((payload.len() + CRC_BYTES_SIZE) as u64)
}
