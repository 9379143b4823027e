/// Profiler Configuration
///
/// Loaded from TOML. A missing file means defaults.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilerConfig {
    /// Label shown for methods without a source file.
    pub native_label: String,
    /// Rayon worker count; 0 picks half the cores.
    pub threads: usize,
    /// `Owner#method` names created as excluded nodes before replay.
    pub exclude: Vec<String>,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// sled directory for persisted records.
    pub path: Option<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            native_label: "<native>".to_string(),
            threads: 0,
            exclude: Vec::new(),
            store: StoreConfig::default(),
        }
    }
}

impl ProfilerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
