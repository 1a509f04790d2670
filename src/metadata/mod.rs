//! In-memory model of the metadata footer
//!
//! A [`Directory`] holds the producing session id, the time bounds of the
//! data, the chunk offset table and an ordered list of typed
//! [`MetadataEntry`] records. Entry order is insertion order and is kept
//! across rewrites.

mod codec;
mod sensor_info;
mod stream;

pub use codec::{BinaryFooterCodec, FooterCodec, METADATA_IDENTIFIER};
pub use sensor_info::{DataFormat, LidarMode, SensorConfig, SensorInfo, UdpProfileImu, UdpProfileLidar};
pub use stream::{FieldType, LidarScanStreamMeta};

use crate::error::Result;
use serde::Serialize;

/// Type tag of sensor calibration entries
pub const SENSOR_INFO_TAG: &str = "ouster/v1/os_sensor/LidarSensor";

/// Type tag of lidar scan stream descriptors
pub const LIDAR_SCAN_STREAM_TAG: &str = "ouster/v1/os_sensor/LidarScanStream";

/// A record type that can be stored as a metadata entry payload
pub trait MetadataRecord: Sized {
    /// Tag persisted next to the payload bytes
    const TYPE_TAG: &'static str;

    /// Encode into the entry buffer
    fn to_buffer(&self) -> Result<Vec<u8>>;

    /// Decode from an entry buffer
    fn from_buffer(buf: &[u8]) -> Result<Self>;

    /// Stable JSON form used by inspection
    fn to_serializable_form(&self) -> Result<serde_json::Value>;
}

/// Location of one chunk inside the chunk region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChunkOffset {
    pub start_ts: u64,
    pub end_ts: u64,
    /// Absolute file offset of the chunk
    pub offset: u64,
    /// Length including the CRC trailer
    pub length: u64,
}

/// Payload of a metadata entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    SensorInfo(SensorInfo),
    LidarScanStream(LidarScanStreamMeta),
    /// Entry with a tag this library does not interpret, kept byte-for-byte
    Opaque { type_tag: String, buffer: Vec<u8> },
}

impl EntryPayload {
    pub fn type_tag(&self) -> &str {
        match self {
            EntryPayload::SensorInfo(_) => SensorInfo::TYPE_TAG,
            EntryPayload::LidarScanStream(_) => LidarScanStreamMeta::TYPE_TAG,
            EntryPayload::Opaque { type_tag, .. } => type_tag,
        }
    }

    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        match self {
            EntryPayload::SensorInfo(info) => info.to_buffer(),
            EntryPayload::LidarScanStream(meta) => meta.to_buffer(),
            EntryPayload::Opaque { buffer, .. } => Ok(buffer.clone()),
        }
    }

    /// Rebuild a payload from its stored tag and bytes.
    ///
    /// Unknown tags become [`EntryPayload::Opaque`] instead of failing.
    pub fn from_tagged(type_tag: &str, buffer: &[u8]) -> Result<Self> {
        match type_tag {
            SENSOR_INFO_TAG => Ok(EntryPayload::SensorInfo(SensorInfo::from_buffer(buffer)?)),
            LIDAR_SCAN_STREAM_TAG => Ok(EntryPayload::LidarScanStream(
                LidarScanStreamMeta::from_buffer(buffer)?,
            )),
            other => Ok(EntryPayload::Opaque {
                type_tag: other.to_string(),
                buffer: buffer.to_vec(),
            }),
        }
    }

    /// JSON rendering of the payload for the `buffer` field of a dump
    pub fn render(&self) -> Result<serde_json::Value> {
        match self {
            EntryPayload::SensorInfo(info) => Ok(serde_json::json!({
                "sensor_info": info.to_serializable_form()?
            })),
            EntryPayload::LidarScanStream(meta) => meta.to_serializable_form(),
            EntryPayload::Opaque { buffer, .. } => Ok(serde_json::json!({
                "opaque": hex::encode(buffer)
            })),
        }
    }
}

impl From<SensorInfo> for EntryPayload {
    fn from(info: SensorInfo) -> Self {
        EntryPayload::SensorInfo(info)
    }
}

impl From<LidarScanStreamMeta> for EntryPayload {
    fn from(meta: LidarScanStreamMeta) -> Self {
        EntryPayload::LidarScanStream(meta)
    }
}

/// One typed record inside the directory
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub id: u32,
    pub payload: EntryPayload,
}

impl MetadataEntry {
    pub fn type_tag(&self) -> &str {
        self.payload.type_tag()
    }
}

/// Metadata footer contents
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directory {
    pub id: String,
    pub start_ts: u64,
    pub end_ts: u64,
    pub chunks: Vec<ChunkOffset>,
    pub entries: Vec<MetadataEntry>,
}

impl Directory {
    /// Create an empty directory for a session id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Append an entry, assigning the next free id. Returns the id.
    pub fn add_entry(&mut self, payload: impl Into<EntryPayload>) -> u32 {
        let id = self.next_entry_id();
        self.entries.push(MetadataEntry {
            id,
            payload: payload.into(),
        });
        id
    }

    /// Record a chunk and widen the directory time bounds to cover it
    pub fn add_chunk(&mut self, chunk: ChunkOffset) {
        if self.chunks.is_empty() {
            self.start_ts = chunk.start_ts;
            self.end_ts = chunk.end_ts;
        } else {
            self.start_ts = self.start_ts.min(chunk.start_ts);
            self.end_ts = self.end_ts.max(chunk.end_ts);
        }
        self.chunks.push(chunk);
    }

    /// Look up an entry by id
    pub fn entry(&self, id: u32) -> Option<&MetadataEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All entries carrying a given type tag, in directory order
    pub fn entries_of_type<'a>(&'a self, type_tag: &'a str) -> impl Iterator<Item = &'a MetadataEntry> + 'a {
        self.entries.iter().filter(move |e| e.type_tag() == type_tag)
    }

    fn next_entry_id(&self) -> u32 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }
}
