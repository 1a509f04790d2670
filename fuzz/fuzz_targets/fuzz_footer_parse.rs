#![no_main]

use libfuzzer_sys::fuzz_target;
use osf_rs::{dump_metadata, load_footer, BinaryFooterCodec, FooterCodec, HEADER_SIZE};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Raw footer bytes straight into the decoder - should never panic
    if let Ok(directory) = BinaryFooterCodec.decode(data) {
        let _ = BinaryFooterCodec.encode(&directory);
    }

    // Skip inputs too small to hold a header
    if data.len() < HEADER_SIZE {
        return;
    }

    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    // Whole-file parse - should never panic
    if load_footer(temp_file.path()).is_ok() {
        let _ = dump_metadata(temp_file.path(), false);
    }
});
