use super::{MetadataRecord, LIDAR_SCAN_STREAM_TAG};
use crate::error::{OsfError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Element type of one channel field in a lidar scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Void = 0,
    Uint8 = 1,
    Uint16 = 2,
    Uint32 = 3,
    Uint64 = 4,
    Int8 = 5,
    Int16 = 6,
    Int32 = 7,
    Int64 = 8,
    Float32 = 9,
    Float64 = 10,
}

impl FieldType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Void),
            1 => Ok(Self::Uint8),
            2 => Ok(Self::Uint16),
            3 => Ok(Self::Uint32),
            4 => Ok(Self::Uint64),
            5 => Ok(Self::Int8),
            6 => Ok(Self::Int16),
            7 => Ok(Self::Int32),
            8 => Ok(Self::Int64),
            9 => Ok(Self::Float32),
            10 => Ok(Self::Float64),
            _ => Err(OsfError::InvalidEntry(format!(
                "unknown field type code {}",
                value
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "VOID",
            Self::Uint8 => "UINT8",
            Self::Uint16 => "UINT16",
            Self::Uint32 => "UINT32",
            Self::Uint64 => "UINT64",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
        }
    }
}

/// Descriptor of a lidar scan stream: which sensor entry produced it and
/// which channel fields each scan carries.
///
/// Buffer layout: `sensor_id: u32`, `count: u32`, then per field
/// `name_len: u16`, `name`, `type: u8`. Fields are kept sorted by name so
/// both the bytes and the rendering are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LidarScanStreamMeta {
    pub sensor_id: u32,
    pub field_types: BTreeMap<String, FieldType>,
}

impl LidarScanStreamMeta {
    pub fn new(sensor_id: u32, field_types: BTreeMap<String, FieldType>) -> Self {
        Self {
            sensor_id,
            field_types,
        }
    }
}

impl fmt::Display for LidarScanStreamMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LidarScanStreamMeta: sensor_id = {}, field_types = {{",
            self.sensor_id
        )?;
        for (i, (name, ty)) in self.field_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, ty.name())?;
        }
        write!(f, "}}")
    }
}

impl MetadataRecord for LidarScanStreamMeta {
    const TYPE_TAG: &'static str = LIDAR_SCAN_STREAM_TAG;

    fn to_buffer(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.sensor_id.to_le_bytes());
        let count = u32::try_from(self.field_types.len()).map_err(|_| {
            OsfError::InvalidEntry(format!("too many fields: {}", self.field_types.len()))
        })?;
        buf.extend_from_slice(&count.to_le_bytes());

        for (name, ty) in &self.field_types {
            let name_bytes = name.as_bytes();
            if name_bytes.len() > u16::MAX as usize {
                return Err(OsfError::InvalidEntry(format!(
                    "field name too long: {} bytes (max {})",
                    name_bytes.len(),
                    u16::MAX
                )));
            }
            buf.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
            buf.extend_from_slice(name_bytes);
            buf.push(*ty as u8);
        }

        Ok(buf)
    }

    fn from_buffer(buf: &[u8]) -> Result<Self> {
        let mut rest = buf;
        let sensor_id = u32::from_le_bytes(take_array(&mut rest)?);
        let count = u32::from_le_bytes(take_array(&mut rest)?);

        let mut field_types = BTreeMap::new();
        for _ in 0..count {
            let name_len = u16::from_le_bytes(take_array(&mut rest)?) as usize;
            let name = take(&mut rest, name_len)?;
            let name = String::from_utf8(name.to_vec())
                .map_err(|e| OsfError::InvalidEntry(format!("field name: {}", e)))?;
            let [code] = take_array::<1>(&mut rest)?;
            if field_types.contains_key(&name) {
                return Err(OsfError::InvalidEntry(format!(
                    "field {} listed more than once",
                    name
                )));
            }
            field_types.insert(name, FieldType::from_u8(code)?);
        }

        if !rest.is_empty() {
            return Err(OsfError::InvalidEntry(format!(
                "{} trailing bytes after stream descriptor",
                rest.len()
            )));
        }

        Ok(Self {
            sensor_id,
            field_types,
        })
    }

    fn to_serializable_form(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::String(self.to_string()))
    }
}

fn take<'a>(rest: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if rest.len() < n {
        return Err(OsfError::InvalidEntry(
            "stream descriptor truncated".to_string(),
        ));
    }
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    Ok(head)
}

fn take_array<const N: usize>(rest: &mut &[u8]) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(rest, N)?);
    Ok(out)
}
