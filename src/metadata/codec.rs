//! Footer serialization.
//!
//! The container only needs "directory to bytes" and "bytes to directory";
//! [`FooterCodec`] is that seam and [`BinaryFooterCodec`] the format every
//! file written by this crate uses.

use super::{ChunkOffset, Directory, EntryPayload, MetadataEntry};
use crate::error::{OsfError, Result};
use std::io::{Cursor, Read, Write};

/// Identifier written right after the size prefix
pub const METADATA_IDENTIFIER: [u8; 4] = *b"OSFM";

/// Encoded size of one chunk descriptor
const CHUNK_OFFSET_SIZE: u64 = 32;

/// Smallest possible encoded entry: id + empty tag + empty buffer
const MIN_ENTRY_SIZE: u64 = 4 + 2 + 4;

/// Converts a [`Directory`] to and from footer bytes
pub trait FooterCodec {
    fn encode(&self, directory: &Directory) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Directory>;
}

/// Size-prefixed little-endian footer encoding
///
/// Structure:
/// - Size prefix: uint32, length of everything that follows
/// - Identifier: "OSFM" (4 bytes)
/// - Id: uint32 length + UTF-8 bytes
/// - Start/end timestamps: uint64 each
/// - Chunk count: uint32, then per chunk start_ts, end_ts, offset, length (uint64 each)
/// - Entry count: uint32, then per entry id (uint32), tag (uint16 length + UTF-8),
///   buffer (uint32 length + bytes)
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFooterCodec;

impl FooterCodec for BinaryFooterCodec {
    fn encode(&self, directory: &Directory) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(256);
        body.write_all(&METADATA_IDENTIFIER)?;

        write_bytes_u32(&mut body, directory.id.as_bytes(), "directory id")?;
        body.write_all(&directory.start_ts.to_le_bytes())?;
        body.write_all(&directory.end_ts.to_le_bytes())?;

        write_count(&mut body, directory.chunks.len(), "chunk")?;
        for chunk in &directory.chunks {
            body.write_all(&chunk.start_ts.to_le_bytes())?;
            body.write_all(&chunk.end_ts.to_le_bytes())?;
            body.write_all(&chunk.offset.to_le_bytes())?;
            body.write_all(&chunk.length.to_le_bytes())?;
        }

        write_count(&mut body, directory.entries.len(), "entry")?;
        for entry in &directory.entries {
            body.write_all(&entry.id.to_le_bytes())?;

            let tag = entry.type_tag().as_bytes();
            if tag.len() > u16::MAX as usize {
                return Err(OsfError::InvalidEntry(format!(
                    "type tag too long: {} bytes (max {})",
                    tag.len(),
                    u16::MAX
                )));
            }
            body.write_all(&(tag.len() as u16).to_le_bytes())?;
            body.write_all(tag)?;

            write_bytes_u32(&mut body, &entry.payload.to_buffer()?, "entry buffer")?;
        }

        let size = u32::try_from(body.len()).map_err(|_| {
            OsfError::InvalidEntry(format!("footer too large: {} bytes", body.len()))
        })?;

        let mut out = Vec::with_capacity(body.len() + 4);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Directory> {
        let mut cursor = Cursor::new(bytes);

        let size = read_u32(&mut cursor)? as usize;
        if size != bytes.len() - 4 {
            return Err(OsfError::MalformedFooter(format!(
                "size prefix {} does not match {} footer bytes",
                size,
                bytes.len() - 4
            )));
        }

        let mut ident = [0u8; 4];
        read_exact(&mut cursor, &mut ident)?;
        if ident != METADATA_IDENTIFIER {
            return Err(OsfError::MalformedFooter(format!(
                "unexpected identifier {:?}",
                String::from_utf8_lossy(&ident)
            )));
        }

        let id = read_string_u32(&mut cursor)?;
        let start_ts = read_u64(&mut cursor)?;
        let end_ts = read_u64(&mut cursor)?;

        let chunk_count = read_count(&mut cursor, CHUNK_OFFSET_SIZE, "chunk")?;
        let mut chunks = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            chunks.push(ChunkOffset {
                start_ts: read_u64(&mut cursor)?,
                end_ts: read_u64(&mut cursor)?,
                offset: read_u64(&mut cursor)?,
                length: read_u64(&mut cursor)?,
            });
        }

        let entry_count = read_count(&mut cursor, MIN_ENTRY_SIZE, "entry")?;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let id = read_u32(&mut cursor)?;
            let tag_len = read_u16(&mut cursor)? as usize;
            let tag = read_string(&mut cursor, tag_len)?;
            let buf_len = read_u32(&mut cursor)? as usize;
            let buffer = read_vec(&mut cursor, buf_len)?;

            let payload = EntryPayload::from_tagged(&tag, &buffer).map_err(|e| {
                OsfError::MalformedFooter(format!("entry {} ({}): {}", id, tag, e))
            })?;
            entries.push(MetadataEntry { id, payload });
        }

        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(OsfError::MalformedFooter(format!(
                "{} trailing bytes after directory",
                bytes.len() - consumed
            )));
        }

        Ok(Directory {
            id,
            start_ts,
            end_ts,
            chunks,
            entries,
        })
    }
}

fn write_count(out: &mut Vec<u8>, count: usize, what: &str) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| OsfError::InvalidEntry(format!("too many {} records: {}", what, count)))?;
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn write_bytes_u32(out: &mut Vec<u8>, data: &[u8], what: &str) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| OsfError::InvalidEntry(format!("{} too large: {} bytes", what, data.len())))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(data);
    Ok(())
}

// Helper functions for reading primitive types; running out of input is a
// malformed footer, not an I/O failure.
fn read_exact(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    cursor
        .read_exact(buf)
        .map_err(|_| OsfError::MalformedFooter("footer truncated".to_string()))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(cursor, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(cursor, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(cursor, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

fn read_vec(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    if len as u64 > remaining(cursor) {
        return Err(OsfError::MalformedFooter(format!(
            "field of {} bytes overruns footer",
            len
        )));
    }
    let mut buf = vec![0u8; len];
    read_exact(cursor, &mut buf)?;
    Ok(buf)
}

fn read_string(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<String> {
    String::from_utf8(read_vec(cursor, len)?)
        .map_err(|e| OsfError::MalformedFooter(format!("invalid UTF-8: {}", e)))
}

fn read_string_u32(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = read_u32(cursor)? as usize;
    read_string(cursor, len)
}

/// Read a record count and reject counts the remaining bytes cannot hold
fn read_count(cursor: &mut Cursor<&[u8]>, min_record_size: u64, what: &str) -> Result<usize> {
    let count = read_u32(cursor)? as u64;
    if count * min_record_size > remaining(cursor) {
        return Err(OsfError::MalformedFooter(format!(
            "{} count {} exceeds remaining footer bytes",
            what, count
        )));
    }
    Ok(count as usize)
}
