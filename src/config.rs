use crate::git::CommittedMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiffConfig {
    /// Diff viewer; `meld` or any command taking `<left> <right>`.
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Regex of paths hidden from `svp diff`. Empty hides nothing.
    #[serde(default)]
    pub skip: String,
    /// Reference compared against when no branch is given.
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub compare: CommittedMode,
    /// Paths that every client touches and that are never reported.
    #[serde(default)]
    pub always_modified: Vec<String>,
}

fn default_tool() -> String {
    "meld".to_string()
}

fn default_branch() -> String {
    "origin/master".to_string()
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            skip: String::new(),
            branch: default_branch(),
            compare: CommittedMode::default(),
            always_modified: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path ($SVP_CONFIG, else ~/.config/svp/config.toml).
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os("SVP_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svp")
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
