use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::errors::{Error, Result};

/// Tie-break rule applied when two values share a rank-determining count.
///
/// Relying on incidental input order for ties produces non-reproducible
/// reports, so the rule is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Lexicographic ascending on the value label (default)
    Lexicographic,
    /// Order of first appearance in the source relation
    FirstSeen,
}

/// How the unpivot step treats a true blank (missing) source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlankPolicy {
    /// Blank source cells produce no row; a user with all-blank columns
    /// contributes nothing to the relation (default)
    Drop,
    /// Each blank source cell produces one row carrying the sentinel label
    Substitute,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sentinel label substituted for values that resolve to blank
    pub null_substitute: String,

    /// Number of entries Top-N queries return when the caller passes no limit
    pub top_n_default: usize,

    /// Tie-break rule for ranked queries
    pub tie_break: TieBreak,

    /// A user is multi-use when its distinct-value count is strictly greater
    /// than this threshold
    pub multi_use_threshold: usize,

    /// Handling of true blanks during unpivot
    pub blank_policy: BlankPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            null_substitute: default_null_substitute(),
            top_n_default: default_top_n(),
            tie_break: TieBreak::Lexicographic,
            multi_use_threshold: default_multi_use_threshold(),
            blank_policy: BlankPolicy::Drop,
        }
    }
}

fn default_null_substitute() -> String {
    "Unknown".to_string()
}

fn default_top_n() -> usize {
    3
}

fn default_multi_use_threshold() -> usize {
    1
}

impl EngineConfig {
    /// Validate the configuration, naming the offending field on failure.
    ///
    /// Runs at engine construction and config load, before any query can
    /// execute.
    pub fn validate(&self) -> Result<()> {
        if self.null_substitute.trim().is_empty() {
            return Err(Error::invalid_configuration(
                "null_substitute must be a non-empty label",
            ));
        }
        if self.top_n_default == 0 {
            return Err(Error::invalid_configuration(
                "top_n_default must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from TOML contents
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. Parse and validation failures are surfaced, not
    /// silently defaulted.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match read_config_file(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                log::warn!("failed to read config file {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        let config = Self::from_toml_str(&contents)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

/// Pure function to read config file contents
fn read_config_file(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}
