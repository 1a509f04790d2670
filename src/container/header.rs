use crate::error::{OsfError, Result};
use std::io::{Read, Write};

/// Magic number: 0x89 'O' 'S' 'F' 0x0D 0x0A 0x1A 0x0A
/// Follows PNG pattern for corruption detection
pub const MAGIC_NUMBER: [u8; 8] = [0x89, b'O', b'S', b'F', 0x0D, 0x0A, 0x1A, 0x0A];

/// Current format version
pub const FORMAT_VERSION: u16 = 2;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Bytes covered by the header CRC (everything before the CRC field)
const HEADER_CRC_COVERAGE: usize = 44;

/// Lifecycle state recorded in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Chunks may still be appended, no footer recorded yet
    Incomplete,
    /// Footer location and size are valid
    Finished,
    /// Status byte written by a newer producer
    Other(u8),
}

impl FileStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Incomplete,
            1 => Self::Finished,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Incomplete => 0,
            Self::Finished => 1,
            Self::Other(value) => value,
        }
    }

    /// Name used by the JSON projection and text summary
    pub fn label(self) -> String {
        match self {
            Self::Incomplete => "INCOMPLETE".to_string(),
            Self::Finished => "FINISHED".to_string(),
            Self::Other(value) => format!("UNKNOWN({})", value),
        }
    }
}

/// File header at the beginning of an OSF file
///
/// Structure (64 bytes fixed, little-endian):
/// - Magic: 8 bytes
/// - Version: uint16
/// - Status: uint8
/// - Reserved: 1 byte
/// - File size: uint64
/// - Metadata offset: uint64
/// - Metadata size (footer + CRC): uint64
/// - Chunks offset: uint64
/// - Header CRC32 over the 44 bytes above: uint32
/// - Reserved: 16 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub status: FileStatus,
    pub file_size: u64,
    pub metadata_offset: u64,
    pub metadata_size: u64,
    pub chunks_offset: u64,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            status: FileStatus::Incomplete,
            file_size: HEADER_SIZE as u64,
            metadata_offset: 0,
            metadata_size: 0,
            chunks_offset: HEADER_SIZE as u64,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == FileStatus::Finished
    }

    /// Serialize into the fixed-size on-disk form
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&MAGIC_NUMBER);
        buf[8..10].copy_from_slice(&self.version.to_le_bytes());
        buf[10] = self.status.as_u8();
        buf[12..20].copy_from_slice(&self.file_size.to_le_bytes());
        buf[20..28].copy_from_slice(&self.metadata_offset.to_le_bytes());
        buf[28..36].copy_from_slice(&self.metadata_size.to_le_bytes());
        buf[36..44].copy_from_slice(&self.chunks_offset.to_le_bytes());

        let crc = crc32fast::hash(&buf[..HEADER_CRC_COVERAGE]);
        buf[44..48].copy_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Parse and validate the fixed-size on-disk form
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if buf[0..8] != MAGIC_NUMBER {
            return Err(OsfError::CorruptHeader(
                "invalid magic number".to_string(),
            ));
        }

        let stored_crc = u32::from_le_bytes(field(buf, 44));
        let actual_crc = crc32fast::hash(&buf[..HEADER_CRC_COVERAGE]);
        if stored_crc != actual_crc {
            return Err(OsfError::CorruptHeader(format!(
                "header CRC mismatch: expected {:08x}, got {:08x}",
                stored_crc, actual_crc
            )));
        }

        let header = Self {
            version: u16::from_le_bytes(field(buf, 8)),
            status: FileStatus::from_u8(buf[10]),
            file_size: u64::from_le_bytes(field(buf, 12)),
            metadata_offset: u64::from_le_bytes(field(buf, 20)),
            metadata_size: u64::from_le_bytes(field(buf, 28)),
            chunks_offset: u64::from_le_bytes(field(buf, 36)),
        };
        header.validate_version()?;

        Ok(header)
    }

    /// Write header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Read header from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Validate version compatibility
    pub fn validate_version(&self) -> Result<()> {
        if self.version > FORMAT_VERSION {
            return Err(OsfError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Check the header against the actual length of its file.
    ///
    /// Only meaningful for finished files: the footer region must start after
    /// the header and end exactly at end-of-file.
    pub fn validate_layout(&self, file_len: u64) -> Result<()> {
        if self.chunks_offset < HEADER_SIZE as u64 {
            return Err(OsfError::CorruptHeader(format!(
                "chunks offset {} lies inside the header",
                self.chunks_offset
            )));
        }
        if !self.is_finished() {
            return Ok(());
        }
        if self.metadata_offset < self.chunks_offset {
            return Err(OsfError::CorruptHeader(format!(
                "metadata offset {} precedes chunks offset {}",
                self.metadata_offset, self.chunks_offset
            )));
        }
        if self.metadata_offset > file_len {
            return Err(OsfError::CorruptHeader(format!(
                "metadata offset {} beyond file length {}",
                self.metadata_offset, file_len
            )));
        }
        let end = self.metadata_offset.checked_add(self.metadata_size);
        if end != Some(file_len) {
            return Err(OsfError::CorruptFooter(format!(
                "footer [{} + {}] does not end at file length {}",
                self.metadata_offset, self.metadata_size, file_len
            )));
        }
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

fn field<const N: usize>(buf: &[u8; HEADER_SIZE], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[at..at + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_header() -> FileHeader {
        FileHeader {
            version: FORMAT_VERSION,
            status: FileStatus::Finished,
            file_size: 1024,
            metadata_offset: 900,
            metadata_size: 124,
            chunks_offset: HEADER_SIZE as u64,
        }
    }

    #[test]
    fn test_file_header_roundtrip() {
        let header = finished_header();

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE);

        let parsed = FileHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_new_header_is_incomplete() {
        let header = FileHeader::new();
        assert_eq!(header.status, FileStatus::Incomplete);
        assert_eq!(header.metadata_offset, 0);
        assert_eq!(header.metadata_size, 0);
        assert_eq!(header.chunks_offset, HEADER_SIZE as u64);
    }

    #[test]
    fn test_unknown_status_preserved() {
        let mut header = finished_header();
        header.status = FileStatus::Other(7);

        let parsed = FileHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed.status, FileStatus::Other(7));
        assert_eq!(parsed.status.label(), "UNKNOWN(7)");
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = finished_header().to_bytes();
        buf[1] = b'X';
        let err = FileHeader::from_bytes(&buf).unwrap_err();
        assert!(err.to_string().contains("invalid magic"));
    }

    #[test]
    fn test_header_crc_detects_field_damage() {
        let mut buf = finished_header().to_bytes();
        buf[21] ^= 0xFF;
        assert!(matches!(
            FileHeader::from_bytes(&buf),
            Err(OsfError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut header = finished_header();
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(
            FileHeader::from_bytes(&header.to_bytes()),
            Err(OsfError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn test_validate_layout() {
        let header = finished_header();
        assert!(header.validate_layout(1024).is_ok());

        // Footer does not reach EOF
        assert!(matches!(
            header.validate_layout(2048),
            Err(OsfError::CorruptFooter(_))
        ));

        // Offset beyond EOF
        assert!(matches!(
            header.validate_layout(800),
            Err(OsfError::CorruptHeader(_))
        ));

        // Incomplete files carry no footer to check
        assert!(FileHeader::new().validate_layout(64).is_ok());
    }
}
