use std::io::Write;

use colored::Colorize;
use log::{Level, LevelFilter};

/// Sets up the logger. `RUST_LOG` takes precedence over `level`.
pub fn init(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "ERROR".bright_red().bold(),
                Level::Warn => "WARN".yellow().bold(),
                Level::Info => "INFO".green(),
                Level::Debug => "DEBUG".blue(),
                Level::Trace => "TRACE".purple(),
            };
            writeln!(
                buf,
                "[{} {:<5}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                level,
                record.args()
            )
        })
        .init();
}
