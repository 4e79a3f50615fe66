//! Handlers of the command line subcommands.
use std::io::{self, Write};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::args::{Args, Command};
use crate::config::{ConfigError, StoreOptions};
use crate::consts::messages;
use crate::nbt::{self, NamedTag, NbtError, ParseError};
use crate::region::{ChunkPos, RegionError, RegionManager};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Nbt(#[from] NbtError),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Opens the world of `args`, runs its command and closes the world.
pub fn run(args: &Args) -> Result<(), CommandError> {
    let options = match &args.config {
        Some(path) => {
            debug!("Loading store options from {}", path.display());
            StoreOptions::load(path)?
        }
        None => StoreOptions::default(),
    };

    let mut store = RegionManager::open(&args.world, options)?;
    let stdout = io::stdout();
    let result = execute(&mut store, &args.command, &mut stdout.lock());
    finish(result, store.close())
}

/// Combines the outcome of a command with the closing of the world. The command's error wins; a
/// closing error that would hide it is only logged.
fn finish(
    result: Result<(), CommandError>,
    closed: Result<(), RegionError>,
) -> Result<(), CommandError> {
    match (result, closed) {
        (Err(e), Err(close_error)) => {
            error!("Failed to close the world: {close_error}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => Ok(closed?),
    }
}

pub fn execute<W: Write>(
    store: &mut RegionManager,
    command: &Command,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::List => list(store, out),
        Command::Get { x, z, raw } => get(store, ChunkPos::new(*x, *z), *raw, out),
        Command::Put { x, z, snbt } => put(store, ChunkPos::new(*x, *z), snbt),
        Command::Delete { x, z } => delete(store, ChunkPos::new(*x, *z)),
        Command::Defrag => defrag(store, out),
    }
}

fn list<W: Write>(store: &mut RegionManager, out: &mut W) -> Result<(), CommandError> {
    let regions = store.region_files()?;
    if regions.is_empty() {
        writeln!(out, "No region files in {}", store.directory().display())?;
        return Ok(());
    }

    for (coord, _) in regions {
        let stats = store.get_region(coord)?.stats();
        writeln!(
            out,
            "{} {:>4} chunks {:>6} used {:>6} wasted {:>6} total sectors",
            coord.filename(),
            stats.live_chunks,
            stats.used_sectors,
            stats.wasted_sectors,
            stats.file_sectors
        )?;
    }
    Ok(())
}

fn get<W: Write>(
    store: &mut RegionManager,
    chunk: ChunkPos,
    raw: bool,
    out: &mut W,
) -> Result<(), CommandError> {
    let Some(data) = store.read_chunk(chunk)? else {
        warn!("{} ({chunk})", *messages::CHUNK_MISSING);
        return Ok(());
    };

    if !raw {
        match nbt::decode(&data) {
            Ok(tag) => {
                writeln!(out, "{tag}")?;
                return Ok(());
            }
            Err(e) => debug!("Payload of {chunk} is not NBT ({e}), printing it as hex"),
        }
    }
    writeln!(out, "{} bytes", data.len())?;
    writeln!(out, "{}", hex(&data))?;
    Ok(())
}

fn put(store: &mut RegionManager, chunk: ChunkPos, text: &str) -> Result<(), CommandError> {
    let tag = nbt::parse(text)?;
    let data = nbt::encode(&NamedTag::unnamed(tag))?;
    store.write_chunk(chunk, &data)?;
    store.flush_all()?;
    info!("Stored {} bytes for {chunk}", data.len());
    Ok(())
}

fn delete(store: &mut RegionManager, chunk: ChunkPos) -> Result<(), CommandError> {
    store.delete_chunk(chunk)?;
    store.flush_all()?;
    info!("Deleted {chunk}");
    Ok(())
}

fn defrag<W: Write>(store: &mut RegionManager, out: &mut W) -> Result<(), CommandError> {
    let rewritten = store.defragment_all()?;
    writeln!(out, "Compacted {rewritten} region files")?;
    Ok(())
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}
