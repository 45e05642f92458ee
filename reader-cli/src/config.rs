//! Reader Configuration
//!
//! Session settings, read from an optional JSON file and overridden from the
//! command line.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Trace file read when none is given
pub const DEFAULT_TRACE_PATH: &str = "out_primary.log";

/// Configuration for an interactive reader session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Trace file to load
    pub trace_path: PathBuf,
    /// Template rendered before each command
    pub prompt: String,
    /// Template rendered after each stepping command
    pub info: String,
    /// Number of instructions or bytes listed by `dis`, `raw` and `hex`
    /// when no count is given
    pub default_count: u64,
}

impl ReaderConfig {
    /// Create a configuration for the given trace, with default templates
    pub fn new(trace_path: impl Into<PathBuf>) -> Self {
        Self {
            trace_path: trace_path.into(),
            ..Self::default()
        }
    }

    /// Load a configuration file
    ///
    /// Fields missing from the file keep their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::from(DEFAULT_TRACE_PATH),
            prompt: "> ".to_string(),
            info: String::new(),
            default_count: 10,
        }
    }
}
