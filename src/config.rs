//! stormjoin configuration.
//!
//! Loaded from `--config <path>`, or `~/.stormjoin/config.toml` when that
//! exists. Every key is optional; missing keys take the defaults below,
//! which match the NOAA storm events / EAGLE-I outage extracts.

use std::fs;
use std::path::{Path, PathBuf};

use jiff::SignedDuration;
use serde::{Deserialize, Deserializer, Serialize};

use crate::assemble::Layout;
use crate::join::{EngineChoice, JoinOptions};
use crate::table::Columns;

/// stormjoin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// How far after an event an observation may be and still match.
    pub tolerance: SignedDuration,

    /// Prepended to observation column names in the merged output.
    pub observation_prefix: String,

    pub matched_column: String,
    pub matched_time_column: String,

    pub engine: EngineChoice,

    /// Sweep key groups in parallel.
    pub parallel: bool,

    /// Zero-pad all-digit keys to this many characters on load.
    pub key_width: Option<usize>,

    /// Key and time columns of the event (left) file.
    #[serde(deserialize_with = "event_columns")]
    pub events: Columns,

    /// Key and time columns of the observation (right) file.
    #[serde(deserialize_with = "observation_columns")]
    pub observations: Columns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: SignedDuration::from_hours(2),
            observation_prefix: "obs_".into(),
            matched_column: "matched".into(),
            matched_time_column: "matched_time".into(),
            engine: EngineChoice::Forward,
            parallel: false,
            key_width: Some(5),
            events: default_event_columns(),
            observations: default_observation_columns(),
        }
    }
}

fn default_event_columns() -> Columns {
    Columns {
        key: "full_fips_code".into(),
        time: "END_DT_UTC".into(),
    }
}

fn default_observation_columns() -> Columns {
    Columns {
        key: "fips_code".into(),
        time: "EAGLEI_DT_UTC".into(),
    }
}

/// A `[events]` or `[observations]` table; absent keys keep the side's default.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialColumns {
    key: Option<String>,
    time: Option<String>,
}

impl PartialColumns {
    fn or(self, defaults: Columns) -> Columns {
        Columns {
            key: self.key.unwrap_or(defaults.key),
            time: self.time.unwrap_or(defaults.time),
        }
    }
}

fn event_columns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Columns, D::Error> {
    Ok(PartialColumns::deserialize(deserializer)?.or(default_event_columns()))
}

fn observation_columns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Columns, D::Error> {
    Ok(PartialColumns::deserialize(deserializer)?.or(default_observation_columns()))
}

impl Config {
    /// Load config from an explicit path, the default path, or defaults.
    ///
    /// An explicit path must exist. The default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(format!("no config file found at {}", path.display()));
                }
                path.to_path_buf()
            }
            None => match Self::path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("no config file; using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config = Self::parse(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and check config text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;

        if config.tolerance.is_negative() {
            return Err(format!(
                "tolerance must not be negative (got {})",
                config.tolerance
            ));
        }

        Ok(config)
    }

    /// The default config file path: `~/.stormjoin/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".stormjoin").join("config.toml"))
    }

    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            tolerance: self.tolerance,
            engine: self.engine,
            parallel: self.parallel,
        }
    }

    pub fn layout(&self) -> Layout {
        Layout {
            observation_prefix: self.observation_prefix.clone(),
            matched_column: self.matched_column.clone(),
            matched_time_column: self.matched_time_column.clone(),
        }
    }
}
