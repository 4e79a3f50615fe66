use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::consts::region::DEFRAG_SUFFIX;
use crate::region::RegionCoord;

/// Creates `path` and its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    info!("Created world directory {}", path.display());
    Ok(())
}

/// Lists the region files of a world directory, sorted by coordinates. Files whose name is not
/// a region file name are skipped.
pub fn region_files(directory: &Path) -> io::Result<Vec<(RegionCoord, PathBuf)>> {
    let mut regions = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(coord) = name.to_str().and_then(RegionCoord::from_filename) {
            regions.push((coord, entry.path()));
        }
    }
    regions.sort_by_key(|(coord, _)| *coord);
    Ok(regions)
}

/// Removes temporary files left behind by an interrupted compaction. The region file they were
/// meant to replace is still intact. Returns how many were removed.
pub fn remove_stale_defrag_files(directory: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(DEFRAG_SUFFIX) || !entry.file_type()?.is_file() {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                warn!("Removed leftover compaction file {name}");
                removed += 1;
            }
            Err(e) => {
                warn!("Failed to remove leftover compaction file {name}: {e}");
                return Err(e);
            }
        }
    }
    Ok(removed)
}
