//! Shared helpers for integration tests

#![allow(dead_code)]

use osf_rs::metadata::{DataFormat, LidarMode, SensorConfig, UdpProfileImu, UdpProfileLidar};
use osf_rs::{append_footer, initialize, Directory, EntryPayload, SensorInfo};
use sha2::{Digest, Sha512};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// SHA-512 of a whole file, hex encoded
pub fn file_sha<P: AsRef<Path>>(path: P) -> String {
    let data = std::fs::read(path).unwrap();
    format!("0x{}", hex::encode(Sha512::digest(&data)))
}

pub fn file_size<P: AsRef<Path>>(path: P) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

/// Truncate file to specified size
pub fn truncate_file<P: AsRef<Path>>(path: P, new_size: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_size).unwrap();
}

/// Append raw bytes at end of file
pub fn append_bytes<P: AsRef<Path>>(path: P, data: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(data).unwrap();
}

/// Flip bits of the byte at `offset`
pub fn flip_byte<P: AsRef<Path>>(path: P, offset: usize) {
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[offset] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();
}

/// Sensor record whose numeric fields are derived from `start_number`
pub fn gen_new_metadata(start_number: u32) -> SensorInfo {
    let pixels_per_column = 128u32;
    let mut extrinsic = [[0.0; 4]; 4];
    for (i, row) in extrinsic.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    SensorInfo {
        sn: 123456,
        fw_rev: "sqrt(-1) friends".to_string(),
        prod_line: "OS-1-128".to_string(),
        prod_pn: "import random; print(random.random())".to_string(),
        build_date: "2023-02-03T21:45:40Z".to_string(),
        image_rev: "IDK, ask someone else".to_string(),
        status: "Not just good but great".to_string(),
        init_id: 23 + start_number,
        config: SensorConfig {
            lidar_mode: Some(LidarMode::Mode512x10),
            udp_port_lidar: Some(24 + start_number as u16),
            udp_port_imu: Some(25 + start_number as u16),
        },
        format: DataFormat {
            pixels_per_column,
            columns_per_packet: 2 + start_number,
            columns_per_frame: 3 + start_number,
            pixel_shift_by_row: (0..pixels_per_column as i32)
                .map(|i| i + start_number as i32)
                .collect(),
            column_window: [9 + start_number, 10 + start_number],
            udp_profile_lidar: UdpProfileLidar::Rng15Rfl8Nir8,
            udp_profile_imu: UdpProfileImu::Legacy,
            fps: 11 + start_number,
        },
        beam_azimuth_angles: (0..pixels_per_column).map(f64::from).collect(),
        beam_altitude_angles: (0..pixels_per_column).map(f64::from).collect(),
        lidar_origin_to_beam_origin_mm: f64::from(22 + start_number),
        extrinsic,
    }
}

/// Create a file with an empty chunk region and a footer holding `entries`.
///
/// Returns the header size.
pub fn write_init_metadata<P: AsRef<Path>>(path: P, entries: Vec<EntryPayload>) -> u64 {
    let header_size = initialize(&path).unwrap();
    let mut directory = Directory::default();
    for entry in entries {
        directory.add_entry(entry);
    }
    let written = append_footer(&path, &directory).unwrap();
    assert_eq!(file_size(&path), header_size + written);
    header_size
}
