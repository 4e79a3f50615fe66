//! Command line arguments.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cactus-world", version, about = "Inspect and edit the region files of a world")]
pub struct Args {
    /// World directory holding the region files
    pub world: PathBuf,

    /// JSON file with store options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List region files with their usage
    List,

    /// Print a chunk as SNBT
    Get {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        /// Print the payload as hex instead of decoding it
        #[arg(long)]
        raw: bool,
    },

    /// Store a chunk given as SNBT
    Put {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        snbt: String,
    },

    /// Delete a chunk
    Delete {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
    },

    /// Compact every region file
    Defrag,
}
