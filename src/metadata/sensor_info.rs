//! Sensor calibration/config record stored as a metadata entry.
//!
//! The entry buffer is the record's JSON form, so the dump shows exactly
//! what [`SensorInfo::to_json_string`] produces.

use super::{MetadataRecord, SENSOR_INFO_TAG};
use crate::error::{OsfError, Result};
use serde::{Deserialize, Serialize};

/// Horizontal resolution and rotation rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LidarMode {
    #[default]
    #[serde(rename = "UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "512x10")]
    Mode512x10,
    #[serde(rename = "512x20")]
    Mode512x20,
    #[serde(rename = "1024x10")]
    Mode1024x10,
    #[serde(rename = "1024x20")]
    Mode1024x20,
    #[serde(rename = "2048x10")]
    Mode2048x10,
    #[serde(rename = "4096x5")]
    Mode4096x5,
}

/// Lidar packet layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UdpProfileLidar {
    #[default]
    Legacy,
    Rng19Rfl8Sig16Nir16Dual,
    Rng19Rfl8Sig16Nir16,
    Rng15Rfl8Nir8,
    FiveWordPixel,
}

/// IMU packet layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UdpProfileImu {
    #[default]
    Legacy,
}

/// Sensor configuration at capture time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lidar_mode: Option<LidarMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_port_lidar: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_port_imu: Option<u16>,
}

/// Packet/frame format description
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataFormat {
    pub pixels_per_column: u32,
    pub columns_per_packet: u32,
    pub columns_per_frame: u32,
    /// Pixel shift for each row, one value per beam
    #[serde(default)]
    pub pixel_shift_by_row: Vec<i32>,
    /// First and last valid measurement column
    pub column_window: [u32; 2],
    pub udp_profile_lidar: UdpProfileLidar,
    pub udp_profile_imu: UdpProfileImu,
    pub fps: u32,
}

/// Sensor intrinsics and identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub sn: u64,
    pub fw_rev: String,
    pub prod_line: String,
    pub prod_pn: String,
    pub build_date: String,
    pub image_rev: String,
    pub status: String,
    pub init_id: u32,
    pub config: SensorConfig,
    pub format: DataFormat,
    #[serde(default)]
    pub beam_azimuth_angles: Vec<f64>,
    #[serde(default)]
    pub beam_altitude_angles: Vec<f64>,
    pub lidar_origin_to_beam_origin_mm: f64,
    /// Row-major 4x4 sensor-to-body transform
    pub extrinsic: [[f64; 4]; 4],
}

impl Default for SensorInfo {
    fn default() -> Self {
        Self {
            sn: 0,
            fw_rev: String::new(),
            prod_line: String::new(),
            prod_pn: String::new(),
            build_date: String::new(),
            image_rev: String::new(),
            status: String::new(),
            init_id: 0,
            config: SensorConfig::default(),
            format: DataFormat::default(),
            beam_azimuth_angles: Vec::new(),
            beam_altitude_angles: Vec::new(),
            lidar_origin_to_beam_origin_mm: 0.0,
            extrinsic: identity(),
        }
    }
}

impl SensorInfo {
    /// Serialize to a JSON string
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(OsfError::from)
    }

    /// Parse from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_buffer(json.as_bytes())
    }

    /// Check the per-beam arrays against the declared pixels per column
    pub fn validate(&self) -> Result<()> {
        let beams = self.format.pixels_per_column as usize;
        let arrays = [
            ("beam_azimuth_angles", self.beam_azimuth_angles.len()),
            ("beam_altitude_angles", self.beam_altitude_angles.len()),
            ("pixel_shift_by_row", self.format.pixel_shift_by_row.len()),
        ];
        for (name, len) in arrays {
            if len != 0 && len != beams {
                return Err(OsfError::InvalidEntry(format!(
                    "{} has {} values for {} pixels per column",
                    name, len, beams
                )));
            }
        }

        // JSON has no NaN or infinity; such values would not decode again
        ensure_finite(
            "lidar_origin_to_beam_origin_mm",
            [&self.lidar_origin_to_beam_origin_mm],
        )?;
        ensure_finite("beam_azimuth_angles", &self.beam_azimuth_angles)?;
        ensure_finite("beam_altitude_angles", &self.beam_altitude_angles)?;
        ensure_finite("extrinsic", self.extrinsic.iter().flatten())?;
        Ok(())
    }
}

impl MetadataRecord for SensorInfo {
    const TYPE_TAG: &'static str = SENSOR_INFO_TAG;

    fn to_buffer(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(serde_json::to_vec(self)?)
    }

    fn from_buffer(buf: &[u8]) -> Result<Self> {
        serde_json::from_slice(buf)
            .map_err(|e| OsfError::InvalidEntry(format!("sensor info: {}", e)))
    }

    fn to_serializable_form(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn ensure_finite<'a, I>(name: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a f64>,
{
    match values.into_iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(OsfError::InvalidEntry(format!(
            "{} contains non-finite value {}",
            name, bad
        ))),
        None => Ok(()),
    }
}

fn identity() -> [[f64; 4]; 4] {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}
