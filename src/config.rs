//! Store options, loaded from an optional JSON file.
//!
//! ```json
//! { "auto_defragment": true, "defrag_waste_ratio": 0.25, "defrag_min_wasted_sectors": 8 }
//! ```
//!
//! Every field is optional; missing ones take their default.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::defaults;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read the options file: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed options file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid option: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Compact a region file after a flush once enough of it is wasted.
    pub auto_defragment: bool,
    /// Share of the file's sectors that must be wasted, in `(0, 1]`.
    pub defrag_waste_ratio: f64,
    /// Minimum number of wasted sectors.
    pub defrag_min_wasted_sectors: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            auto_defragment: defaults::AUTO_DEFRAGMENT,
            defrag_waste_ratio: defaults::DEFRAG_WASTE_RATIO,
            defrag_min_wasted_sectors: defaults::DEFRAG_MIN_WASTED_SECTORS,
        }
    }
}

impl StoreOptions {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.defrag_waste_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "defrag_waste_ratio must be in (0, 1], got {ratio}"
            )));
        }
        Ok(())
    }

    /// Whether a file of `file_sectors` sectors, `wasted_sectors` of which hold no live data, is
    /// worth compacting.
    pub fn should_defragment(&self, wasted_sectors: u32, file_sectors: u32) -> bool {
        if !self.auto_defragment || file_sectors == 0 {
            return false;
        }
        wasted_sectors >= self.defrag_min_wasted_sectors
            && f64::from(wasted_sectors) / f64::from(file_sectors) >= self.defrag_waste_ratio
    }
}
