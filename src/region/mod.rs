//! Region files: sector-based blob storage for 32x32 blocks of chunks, and the manager that
//! routes chunk coordinates to them.

pub mod coord;
pub mod file;
pub mod manager;

use std::io;

use thiserror::Error;

pub use coord::{region_path, ChunkPos, LocalCoord, RegionCoord};
pub use file::{compact_layout, RegionFile, RegionStats, SectorDescriptor};
pub use manager::RegionManager;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Local coordinates ({x}, {z}) are outside of the region")]
    LocalOutOfBounds { x: u8, z: u8 },

    #[error("Chunk payload of {0} bytes is too large for a region file")]
    PayloadTooLarge(usize),

    #[error("Failed to replace the region file after compaction: {0}")]
    Persist(#[from] tempfile::PersistError),
}
