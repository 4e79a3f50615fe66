//! A single region file.
//!
//! The file starts with a directory of 1024 descriptors, one per chunk slot, followed by 4096-byte
//! sectors. A chunk payload occupies `ceil(len / 4096)` contiguous sectors, zero padded.
//!
//! Writes and deletes are staged in memory and only reach the disk on [`RegionFile::flush`].
//! A flush never writes over sectors the committed directory still points to: new payloads go to
//! free sectors first, then the directory is rewritten. A crash before the directory write leaves
//! the previous state intact.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use log::{debug, error, info, warn};

use super::{LocalCoord, RegionError};
use crate::config::StoreOptions;
use crate::consts::region::{
    DEFRAG_SUFFIX, HEADER_SECTORS, HEADER_SIZE, REGION_SIZE, SECTOR_SIZE, SLOT_COUNT,
};

/// Where a chunk payload lives: its first sector and its exact length in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorDescriptor {
    pub offset: u32,
    pub length: u32,
}

impl SectorDescriptor {
    /// Marks an empty slot. Sector 0 is part of the directory, so it never holds a payload.
    pub const ABSENT: Self = Self {
        offset: 0,
        length: 0,
    };

    pub fn is_present(self) -> bool {
        self.offset != 0
    }

    pub fn sector_count(self) -> u32 {
        sectors_for(self.length as usize) as u32
    }

    fn end(self) -> u64 {
        u64::from(self.offset) + u64::from(self.sector_count())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    /// Committed chunks.
    pub live_chunks: usize,
    /// Sectors holding live payloads, directory excluded.
    pub used_sectors: u32,
    /// Sectors past the directory that hold no live payload.
    pub wasted_sectors: u32,
    pub file_sectors: u32,
}

fn sectors_for(length: usize) -> usize {
    length.div_ceil(SECTOR_SIZE)
}

/// Computes the compacted layout of `directory`: live payloads packed back to back right after
/// the header, in slot order. Empty payloads sit at the first payload sector.
pub fn compact_layout(directory: &[SectorDescriptor]) -> Vec<SectorDescriptor> {
    let mut cursor = HEADER_SECTORS;
    directory
        .iter()
        .map(|descriptor| {
            if !descriptor.is_present() {
                return SectorDescriptor::ABSENT;
            }
            let count = descriptor.sector_count();
            let offset = if count == 0 { HEADER_SECTORS } else { cursor };
            cursor += count;
            SectorDescriptor {
                offset,
                length: descriptor.length,
            }
        })
        .collect()
}

/// First-fit allocation of `count` sectors in `used`. When no free run is long enough, the
/// trailing free run (possibly empty) is extended past the end of the file.
fn allocate(used: &mut Vec<bool>, count: usize) -> usize {
    let mut run_start = HEADER_SECTORS as usize;
    let mut run_length = 0;
    for (sector, &taken) in used.iter().enumerate().skip(HEADER_SECTORS as usize) {
        if run_length == count {
            break;
        }
        if taken {
            run_start = sector + 1;
            run_length = 0;
        } else {
            run_length += 1;
        }
    }

    let end = run_start + count;
    if end > used.len() {
        used.resize(end, false);
    }
    used[run_start..end].fill(true);
    run_start
}

fn encode_directory(directory: &[SectorDescriptor]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE);
    for descriptor in directory {
        buf.put_u32(descriptor.offset);
        buf.put_u32(descriptor.length);
    }
    buf
}

fn decode_directory(mut header: &[u8]) -> Vec<SectorDescriptor> {
    (0..SLOT_COUNT)
        .map(|_| SectorDescriptor {
            offset: header.get_u32(),
            length: header.get_u32(),
        })
        .collect()
}

/// Writes `data` followed by zeros up to the next sector boundary.
fn write_padded<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    writer.write_all(data)?;
    let padding = sectors_for(data.len()) * SECTOR_SIZE - data.len();
    if padding > 0 {
        writer.write_all(&vec![0; padding])?;
    }
    Ok(())
}

fn slot_index(x: u8, z: u8) -> Result<usize, RegionError> {
    if i32::from(x) >= REGION_SIZE || i32::from(z) >= REGION_SIZE {
        return Err(RegionError::LocalOutOfBounds { x, z });
    }
    Ok(LocalCoord::new(x, z).index())
}

pub struct RegionFile {
    path: PathBuf,
    file: File,
    directory: Vec<SectorDescriptor>,
    file_sectors: u32,
    /// Staged writes by slot. `None` stages a delete.
    pending: BTreeMap<usize, Option<Vec<u8>>>,
    options: StoreOptions,
}

impl RegionFile {
    /// Opens the region file at `path`, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self, RegionError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut length = file.metadata()?.len();
        if length < HEADER_SIZE as u64 {
            debug!("Writing an empty directory to {}", path.display());
            file.set_len(HEADER_SIZE as u64)?;
            length = HEADER_SIZE as u64;
        }
        let sector_size = SECTOR_SIZE as u64;
        if length % sector_size != 0 {
            length = length.div_ceil(sector_size) * sector_size;
            file.set_len(length)?;
        }
        let file_sectors = (length / sector_size) as u32;

        let mut header = vec![0; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;

        let mut directory = decode_directory(&header);
        for (slot, descriptor) in directory.iter_mut().enumerate() {
            if !descriptor.is_present() {
                continue;
            }
            if descriptor.offset < HEADER_SECTORS || descriptor.end() > u64::from(file_sectors) {
                let local = LocalCoord::from_index(slot);
                warn!(
                    "Ignoring chunk ({}, {}) of {}: sectors {}..{} are outside of the payload area",
                    local.x,
                    local.z,
                    path.display(),
                    descriptor.offset,
                    descriptor.end()
                );
                *descriptor = SectorDescriptor::ABSENT;
            }
        }

        Ok(Self {
            path,
            file,
            directory,
            file_sectors,
            pending: BTreeMap::new(),
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the payload at `(x, z)`, including writes not flushed yet.
    pub fn read_chunk(&self, x: u8, z: u8) -> Result<Option<Vec<u8>>, RegionError> {
        let slot = slot_index(x, z)?;
        if let Some(staged) = self.pending.get(&slot) {
            return Ok(staged.clone());
        }

        let descriptor = self.directory[slot];
        if !descriptor.is_present() {
            return Ok(None);
        }
        Ok(Some(self.read_payload(descriptor)?))
    }

    pub fn has_chunk(&self, x: u8, z: u8) -> Result<bool, RegionError> {
        let slot = slot_index(x, z)?;
        Ok(match self.pending.get(&slot) {
            Some(staged) => staged.is_some(),
            None => self.directory[slot].is_present(),
        })
    }

    /// Stages `data` for `(x, z)`. Nothing reaches the disk before [`RegionFile::flush`].
    pub fn write_chunk(&mut self, x: u8, z: u8, data: &[u8]) -> Result<(), RegionError> {
        let slot = slot_index(x, z)?;
        if data.len() > u32::MAX as usize {
            return Err(RegionError::PayloadTooLarge(data.len()));
        }
        self.pending.insert(slot, Some(data.to_vec()));
        Ok(())
    }

    pub fn delete_chunk(&mut self, x: u8, z: u8) -> Result<(), RegionError> {
        let slot = slot_index(x, z)?;
        self.pending.insert(slot, None);
        Ok(())
    }

    /// Committed descriptor of `(x, z)`.
    pub fn descriptor(&self, x: u8, z: u8) -> Result<SectorDescriptor, RegionError> {
        Ok(self.directory[slot_index(x, z)?])
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Statistics of the committed state; staged writes are not counted.
    pub fn stats(&self) -> RegionStats {
        let live = self.directory.iter().filter(|d| d.is_present());
        let live_chunks = live.clone().count();
        let used_sectors: u32 = live.map(|d| d.sector_count()).sum();
        let wasted_sectors = self
            .file_sectors
            .saturating_sub(HEADER_SECTORS)
            .saturating_sub(used_sectors);

        RegionStats {
            live_chunks,
            used_sectors,
            wasted_sectors,
            file_sectors: self.file_sectors,
        }
    }

    /// Commits staged writes, then compacts the file if enough of it is wasted.
    pub fn flush(&mut self) -> Result<(), RegionError> {
        if !self.commit()? {
            return Ok(());
        }

        let stats = self.stats();
        if self
            .options
            .should_defragment(stats.wasted_sectors, stats.file_sectors)
        {
            if let Err(e) = self.compact() {
                warn!("Failed to defragment {}: {e}", self.path.display());
            }
        }
        Ok(())
    }

    /// Commits staged writes and compacts the file. Returns whether anything moved.
    pub fn defragment(&mut self) -> Result<bool, RegionError> {
        self.commit()?;
        self.compact()
    }

    /// Flushes and releases the file.
    pub fn close(mut self) -> Result<(), RegionError> {
        let result = self.flush();
        // Don't let `Drop` retry a failed flush.
        self.pending.clear();
        result
    }

    fn read_payload(&self, descriptor: SectorDescriptor) -> io::Result<Vec<u8>> {
        let mut file = &self.file;
        let mut data = vec![0; descriptor.length as usize];
        file.seek(SeekFrom::Start(
            u64::from(descriptor.offset) * SECTOR_SIZE as u64,
        ))?;
        file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Sector occupancy of the committed state, directory included.
    fn used_sectors_map(&self) -> Vec<bool> {
        let mut used = vec![false; self.file_sectors as usize];
        used[..HEADER_SECTORS as usize].fill(true);
        for descriptor in self.directory.iter().filter(|d| d.is_present()) {
            let start = descriptor.offset as usize;
            used[start..descriptor.end() as usize].fill(true);
        }
        used
    }

    /// Writes staged payloads to free sectors, then the new directory. Returns whether there was
    /// anything to commit.
    fn commit(&mut self) -> Result<bool, RegionError> {
        if self.pending.is_empty() {
            return Ok(false);
        }

        let mut directory = self.directory.clone();
        let mut used = self.used_sectors_map();

        for (&slot, staged) in &self.pending {
            let Some(data) = staged else {
                directory[slot] = SectorDescriptor::ABSENT;
                continue;
            };

            let count = sectors_for(data.len());
            let offset = if count == 0 {
                HEADER_SECTORS as usize
            } else {
                allocate(&mut used, count)
            };
            debug!(
                "Slot {slot} of {}: {} bytes at sector {offset} ({count} sectors)",
                self.path.display(),
                data.len()
            );

            if count > 0 {
                self.file
                    .seek(SeekFrom::Start((offset * SECTOR_SIZE) as u64))?;
                write_padded(&mut self.file, data)?;
            }
            directory[slot] = SectorDescriptor {
                offset: offset as u32,
                length: data.len() as u32,
            };
        }
        self.file.sync_data()?;

        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&encode_directory(&directory))?;
        self.file.sync_data()?;

        debug!(
            "Committed {} staged writes to {}",
            self.pending.len(),
            self.path.display()
        );
        self.directory = directory;
        self.file_sectors = used.len() as u32;
        self.pending.clear();
        Ok(true)
    }

    /// Rewrites the committed payloads packed into a sibling temporary file and renames it over
    /// the region file.
    fn compact(&mut self) -> Result<bool, RegionError> {
        let layout = compact_layout(&self.directory);
        let new_sectors = HEADER_SECTORS
            + layout
                .iter()
                .filter(|d| d.is_present())
                .map(|d| d.sector_count())
                .sum::<u32>();
        if layout == self.directory && new_sectors == self.file_sectors {
            return Ok(false);
        }

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".r.")
            .suffix(DEFRAG_SUFFIX)
            .tempfile_in(directory)?;

        temp.write_all(&encode_directory(&layout))?;
        for (old, new) in self.directory.iter().zip(&layout) {
            if new.sector_count() == 0 {
                continue;
            }
            let data = self.read_payload(*old)?;
            write_padded(&mut temp, &data)?;
        }
        temp.as_file()
            .set_permissions(self.file.metadata()?.permissions())?;
        temp.as_file().sync_all()?;

        let file = temp.persist(&self.path)?;
        info!(
            "Defragmented {}: {} -> {} sectors",
            self.path.display(),
            self.file_sectors,
            new_sectors
        );
        self.file = file;
        self.directory = layout;
        self.file_sectors = new_sectors;
        Ok(true)
    }
}

impl Drop for RegionFile {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            error!(
                "Failed to flush {} while closing it, unflushed chunks are lost: {e}",
                self.path.display()
            );
        }
    }
}
