use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use super::{region_path, ChunkPos, LocalCoord, RegionCoord, RegionError, RegionFile};
use crate::config::StoreOptions;
use crate::fs_manager;

/// Routes chunk coordinates to region files of one world directory, keeping every region it
/// touched open until [`RegionManager::close`].
///
/// A manager assumes it is the only writer of its directory.
pub struct RegionManager {
    directory: PathBuf,
    options: StoreOptions,
    regions: HashMap<RegionCoord, RegionFile>,
}

impl RegionManager {
    /// Opens a world directory, creating it if needed and removing leftovers of an interrupted
    /// compaction.
    pub fn open<P: AsRef<Path>>(directory: P, options: StoreOptions) -> Result<Self, RegionError> {
        let directory = directory.as_ref().to_path_buf();
        fs_manager::ensure_dir(&directory)?;
        let removed = fs_manager::remove_stale_defrag_files(&directory)?;
        if removed > 0 {
            info!("Removed {removed} stale compaction files");
        }

        Ok(Self {
            directory,
            options,
            regions: HashMap::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn region_coord(chunk: ChunkPos) -> RegionCoord {
        chunk.region()
    }

    pub fn local_coord(chunk: ChunkPos) -> LocalCoord {
        chunk.local()
    }

    pub fn region_path(&self, coord: RegionCoord) -> PathBuf {
        region_path(&self.directory, coord.x, coord.z)
    }

    /// Returns the region at `coord`, opening (and creating) its file on first use.
    pub fn get_region(&mut self, coord: RegionCoord) -> Result<&mut RegionFile, RegionError> {
        match self.regions.entry(coord) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = region_path(&self.directory, coord.x, coord.z);
                debug!("Opening {coord} at {}", path.display());
                let region = RegionFile::open(path, self.options.clone())?;
                Ok(entry.insert(region))
            }
        }
    }

    /// Like [`RegionManager::get_region`], but never creates a file.
    fn existing_region(
        &mut self,
        coord: RegionCoord,
    ) -> Result<Option<&mut RegionFile>, RegionError> {
        if self.regions.contains_key(&coord) || self.region_path(coord).is_file() {
            self.get_region(coord).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_chunk(&mut self, chunk: ChunkPos) -> Result<Option<Vec<u8>>, RegionError> {
        let local = chunk.local();
        match self.existing_region(chunk.region())? {
            Some(region) => region.read_chunk(local.x, local.z),
            None => Ok(None),
        }
    }

    pub fn has_chunk(&mut self, chunk: ChunkPos) -> Result<bool, RegionError> {
        let local = chunk.local();
        match self.existing_region(chunk.region())? {
            Some(region) => region.has_chunk(local.x, local.z),
            None => Ok(false),
        }
    }

    pub fn write_chunk(&mut self, chunk: ChunkPos, data: &[u8]) -> Result<(), RegionError> {
        let local = chunk.local();
        self.get_region(chunk.region())?
            .write_chunk(local.x, local.z, data)
    }

    pub fn delete_chunk(&mut self, chunk: ChunkPos) -> Result<(), RegionError> {
        let local = chunk.local();
        match self.existing_region(chunk.region())? {
            Some(region) => region.delete_chunk(local.x, local.z),
            None => Ok(()),
        }
    }

    /// Flushes every open region. All of them are attempted; the first error is returned.
    pub fn flush_all(&mut self) -> Result<(), RegionError> {
        let mut first_error = None;
        for (coord, region) in self.regions.iter_mut() {
            if let Err(e) = region.flush() {
                error!("Failed to flush {coord}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flushes and closes every open region.
    pub fn close(mut self) -> Result<(), RegionError> {
        let mut first_error = None;
        for (coord, region) in self.regions.drain() {
            if let Err(e) = region.close() {
                error!("Failed to close {coord}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Region files present in the directory, sorted by coordinates.
    pub fn region_files(&self) -> Result<Vec<(RegionCoord, PathBuf)>, RegionError> {
        Ok(fs_manager::region_files(&self.directory)?)
    }

    /// Compacts every region file of the directory. Returns how many were rewritten.
    pub fn defragment_all(&mut self) -> Result<usize, RegionError> {
        let mut rewritten = 0;
        for (coord, _) in self.region_files()? {
            if self.get_region(coord)?.defragment()? {
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    pub fn open_regions(&self) -> usize {
        self.regions.len()
    }
}
