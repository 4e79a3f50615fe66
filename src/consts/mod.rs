//! This module is where we store constants, like the region file layout or the limits of the NBT
//! codecs.

/// Layout of a region file on disk.
///
/// ```text
/// [ directory: 1024 x (sector offset: u32 BE, byte length: u32 BE) ][ sector 2 ][ sector 3 ] ...
/// ```
pub mod region {
    /// Number of chunks along one axis of a region.
    pub const REGION_SIZE: i32 = 32;

    /// Number of chunk slots in one region file (32 x 32).
    pub const SLOT_COUNT: usize = (REGION_SIZE * REGION_SIZE) as usize;

    /// Size of one allocation unit in bytes.
    pub const SECTOR_SIZE: usize = 4096;

    /// Size of one directory descriptor in bytes.
    pub const DESCRIPTOR_SIZE: usize = 8;

    /// Size of the directory at the start of the file.
    pub const HEADER_SIZE: usize = SLOT_COUNT * DESCRIPTOR_SIZE;

    /// Number of sectors taken by the directory. Payloads start right after.
    pub const HEADER_SECTORS: u32 = (HEADER_SIZE / SECTOR_SIZE) as u32;

    /// Region file names look like `r.-1.3.region`.
    pub const FILE_PREFIX: &str = "r";
    pub const FILE_EXTENSION: &str = "region";

    /// Suffix of the temporary file a compaction writes before swapping it in.
    pub const DEFRAG_SUFFIX: &str = ".defrag";
}

/// Limits of the NBT binary and text codecs.
pub mod nbt {
    /// Deepest allowed nesting of compounds and lists.
    pub const MAX_DEPTH: usize = 512;

    /// Longest name or string the binary format can hold (u16 length prefix).
    pub const MAX_STRING_BYTES: usize = u16::MAX as usize;
}

/// Defaults of [`crate::config::StoreOptions`].
pub mod defaults {
    pub const AUTO_DEFRAGMENT: bool = true;
    pub const DEFRAG_WASTE_RATIO: f64 = 0.25;
    pub const DEFRAG_MIN_WASTED_SECTORS: u32 = 8;
}

/// Console messages of the command line tool.
pub mod messages {

    use colored::*;
    use once_cell::sync::Lazy;

    pub static TOOL_STARTING: Lazy<String> = Lazy::new(|| {
        format!("cactus-world {}", env!("CARGO_PKG_VERSION"))
            .bold()
            .to_string()
    });

    pub static DONE: Lazy<String> = Lazy::new(|| "[ DONE ]".bright_green().bold().to_string());

    pub static FAILED: Lazy<String> =
        Lazy::new(|| "[ FAILED ]".bright_red().bold().to_string());

    pub static CHUNK_MISSING: Lazy<String> =
        Lazy::new(|| "No chunk stored at these coordinates".yellow().to_string());

    /// Used when exiting the tool with an exit code.
    pub fn exit_code(code: i32) -> String {
        format!("[ exited with code: {code} ]")
            .to_uppercase()
            .bright_red()
            .bold()
            .to_string()
    }
}
