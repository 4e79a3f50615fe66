//! The tool's entrypoint file.
use clap::Parser;
use log::{error, info};

use cactus_world::args::Args;
use cactus_world::consts::messages;
use cactus_world::{commands, logging};

fn main() {
    let args = Args::parse();

    logging::init(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    info!("{}", *messages::TOOL_STARTING);

    if let Err(e) = commands::run(&args) {
        error!("{} {e}", *messages::FAILED);
        gracefully_exit(ExitCode::Failure);
    }

    info!("{}", *messages::DONE);
    gracefully_exit(ExitCode::Success);
}

/// Enum representing standardized exit codes.
pub enum ExitCode {
    Success,
    Failure,
}

/// Exits the tool with an exit code.
pub fn gracefully_exit(exit_code: ExitCode) -> ! {
    let numerical_exit_code: i32 = match exit_code {
        // 0 means success
        ExitCode::Success => 0,
        // 1 means general error
        ExitCode::Failure => {
            error!("{}", messages::exit_code(1));
            1
        }
    };

    std::process::exit(numerical_exit_code);
}
