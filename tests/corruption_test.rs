//! Corruption detection for header and footer

mod common;

use common::{append_bytes, file_size, flip_byte, gen_new_metadata, truncate_file, write_init_metadata};
use osf_rs::{
    dump_metadata, finalize, load_footer, load_header, rewrite_metadata, OsfError, HEADER_SIZE,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn create_test_file() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("test.osf");
    write_init_metadata(&path, vec![gen_new_metadata(3).into()]);
    (temp_dir, path)
}

#[test]
fn test_every_footer_byte_flip_is_a_checksum_mismatch() {
    let (_dir, path) = create_test_file();
    let original = std::fs::read(&path).unwrap();
    let header = load_header(&path).unwrap();

    // Sample across the footer including the CRC trailer itself
    let start = header.metadata_offset as usize;
    let step = (original.len() - start) / 97 + 1;
    for offset in (start..original.len()).step_by(step).chain([original.len() - 1]) {
        std::fs::write(&path, &original).unwrap();
        flip_byte(&path, offset);

        match load_footer(&path) {
            Err(OsfError::ChecksumMismatch { .. }) => {}
            other => panic!("flip at {} not detected: {:?}", offset, other.map(|_| ())),
        }
    }
}

#[test]
fn test_corrupt_footer_blocks_dump_and_rewrite() {
    let (_dir, path) = create_test_file();
    let header = load_header(&path).unwrap();
    flip_byte(&path, header.metadata_offset as usize + 10);
    let damaged = std::fs::read(&path).unwrap();

    assert!(dump_metadata(&path, true).unwrap_err().is_footer_corruption());
    assert!(rewrite_metadata(&path, [gen_new_metadata(4)])
        .unwrap_err()
        .is_footer_corruption());

    // Refused rewrite leaves the file untouched
    assert_eq!(std::fs::read(&path).unwrap(), damaged);
}

#[test]
fn test_corrupted_magic_number() {
    let (_dir, path) = create_test_file();
    flip_byte(&path, 0);

    match load_header(&path) {
        Err(OsfError::CorruptHeader(msg)) => assert!(msg.contains("magic")),
        other => panic!("Expected CorruptHeader, got: {:?}", other),
    }
}

#[test]
fn test_corrupted_header_field() {
    let (_dir, path) = create_test_file();
    // Inside metadata_offset
    flip_byte(&path, 22);

    assert!(matches!(load_header(&path), Err(OsfError::CorruptHeader(_))));
    assert!(matches!(dump_metadata(&path, false), Err(OsfError::CorruptHeader(_))));
}

#[test]
fn test_truncated_header() {
    let (_dir, path) = create_test_file();
    truncate_file(&path, 32);

    assert!(matches!(load_header(&path), Err(OsfError::CorruptHeader(_))));
    assert!(matches!(finalize(&path, 64, 0), Err(OsfError::CorruptHeader(_))));
}

#[test]
fn test_truncated_footer() {
    let (_dir, path) = create_test_file();
    let size = file_size(&path);
    truncate_file(&path, size - 3);

    assert!(matches!(load_footer(&path), Err(OsfError::CorruptFooter(_))));
}

#[test]
fn test_trailing_garbage_after_footer() {
    let (_dir, path) = create_test_file();
    append_bytes(&path, b"garbage");

    assert!(matches!(load_footer(&path), Err(OsfError::CorruptFooter(_))));
}

#[test]
fn test_not_an_osf_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("random.bin");
    std::fs::write(&path, vec![0x5Au8; HEADER_SIZE * 4]).unwrap();

    assert!(matches!(load_header(&path), Err(OsfError::CorruptHeader(_))));
}
