//! World storage: the NBT tag format (binary and SNBT) and region files holding per-chunk blobs.
pub mod args;
pub mod commands;
pub mod config;
pub mod consts;
pub mod fs_manager;
pub mod logging;
pub mod nbt;
pub mod region;
