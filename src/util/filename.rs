//! Segment file naming conventions.
//!
//! Segment files are the only files the store reads or writes. They are
//! named with a six-digit zero-padded decimal id and a `.log` extension,
//! e.g. `000001.log`.

use std::path::{Path, PathBuf};

/// Extension used by segment files.
const SEGMENT_EXT: &str = "log";

/// Generate a segment file path.
pub fn segment_file_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{:06}.{}", id, SEGMENT_EXT))
}

/// Parse a file name and return its segment id.
///
/// Returns `None` if the name is not a decimal stem with a `.log`
/// extension, or if the id is not strictly positive.
pub fn parse_segment_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".log")?;

    let id = stem.parse::<u64>().ok()?;
    if id == 0 {
        return None;
    }

    Some(id)
}

/// List the ids of all segment files in a directory, ascending.
///
/// Files whose names do not parse as segment ids are skipped.
pub fn list_segment_ids(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut ids = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if let Some(id) = parse_segment_file_name(&name) {
            ids.push(id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Create directory if it doesn't exist.
pub fn create_dir_if_missing(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}
