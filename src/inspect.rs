//! Diagnostic views of an OSF file: a JSON projection of header and
//! directory, and a short plain-text summary.

use crate::container::{load_footer, FileHeader};
use crate::error::Result;
use crate::metadata::Directory;
use serde_json::{json, Value};
use std::path::Path;

/// Render header and footer of a finished file as JSON.
///
/// `pretty` selects indented output, otherwise the document is a single
/// line. The footer is CRC-verified first; a corrupt footer is an error.
pub fn dump_metadata<P: AsRef<Path>>(path: P, pretty: bool) -> Result<String> {
    let (header, directory) = load_footer(path)?;
    let doc = to_json(&header, &directory)?;

    let text = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(text)
}

/// JSON projection of a header and directory
pub fn to_json(header: &FileHeader, directory: &Directory) -> Result<Value> {
    let entries = directory
        .entries
        .iter()
        .map(|entry| {
            Ok(json!({
                "id": entry.id,
                "type": entry.type_tag(),
                "buffer": entry.payload.render()?,
            }))
        })
        .collect::<Result<Vec<Value>>>()?;

    Ok(json!({
        "header": {
            "status": header.status.label(),
            "version": header.version,
            "size": header.file_size,
            "metadata_offset": header.metadata_offset,
            "metadata_size": header.metadata_size,
            "chunks_offset": header.chunks_offset,
        },
        "metadata": {
            "id": directory.id,
            "start_ts": directory.start_ts,
            "end_ts": directory.end_ts,
            "chunks": serde_json::to_value(&directory.chunks)?,
            "entries": entries,
        }
    }))
}

/// One-screen text summary of a finished file
pub fn summarize<P: AsRef<Path>>(path: P) -> Result<String> {
    let (header, directory) = load_footer(path)?;
    Ok(summary_text(&header, &directory))
}

fn summary_text(header: &FileHeader, directory: &Directory) -> String {
    let id = if directory.id.is_empty() { "<none>" } else { directory.id.as_str() };
    let mut out = format!(
        "OSF v{} [{}]\n  size: {} bytes, chunks at {}, metadata at {} ({} bytes)\n  id: {}\n  time: {} .. {}\n  chunks: {}\n  entries: {}\n",
        header.version,
        header.status.label(),
        header.file_size,
        header.chunks_offset,
        header.metadata_offset,
        header.metadata_size,
        id,
        directory.start_ts,
        directory.end_ts,
        directory.chunks.len(),
        directory.entries.len(),
    );
    for entry in &directory.entries {
        out.push_str(&format!("    [{}] {}\n", entry.id, entry.type_tag()));
    }
    out
}
