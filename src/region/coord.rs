use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::region::{FILE_EXTENSION, FILE_PREFIX, REGION_SIZE};

/// Position of a chunk in the world, in chunk units. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region holding this chunk (floor division by 32).
    pub fn region(self) -> RegionCoord {
        RegionCoord {
            x: self.x.div_euclid(REGION_SIZE),
            z: self.z.div_euclid(REGION_SIZE),
        }
    }

    /// The chunk's position inside its region, both axes in `[0, 32)`.
    pub fn local(self) -> LocalCoord {
        LocalCoord {
            x: self.x.rem_euclid(REGION_SIZE) as u8,
            z: self.z.rem_euclid(REGION_SIZE) as u8,
        }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk ({}, {})", self.x, self.z)
    }
}

/// Coordinates of a region, i.e. of a 32x32 block of chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// `r.<x>.<z>.region`
    pub fn filename(self) -> String {
        format!("{FILE_PREFIX}.{}.{}.{FILE_EXTENSION}", self.x, self.z)
    }

    /// Inverse of [`RegionCoord::filename`]. Returns `None` for any other file name.
    pub fn from_filename(name: &str) -> Option<Self> {
        let mut parts = name.split('.');
        if parts.next()? != FILE_PREFIX {
            return None;
        }
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next()? != FILE_EXTENSION || parts.next().is_some() {
            return None;
        }
        Some(Self { x, z })
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region ({}, {})", self.x, self.z)
    }
}

/// Position of a chunk inside its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalCoord {
    pub x: u8,
    pub z: u8,
}

impl LocalCoord {
    pub fn new(x: u8, z: u8) -> Self {
        Self { x, z }
    }

    /// Directory slot of this position: `z * 32 + x`.
    pub fn index(self) -> usize {
        usize::from(self.z) * REGION_SIZE as usize + usize::from(self.x)
    }

    pub fn from_index(index: usize) -> Self {
        let size = REGION_SIZE as usize;
        Self {
            x: (index % size) as u8,
            z: (index / size) as u8,
        }
    }
}

/// Path of the region file for region `(rx, rz)` inside `directory`.
pub fn region_path<P: AsRef<Path>>(directory: P, rx: i32, rz: i32) -> PathBuf {
    directory.as_ref().join(RegionCoord::new(rx, rz).filename())
}
