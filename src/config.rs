//! Optional `c-docgen.toml` configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{DocError, Result};

pub const CONFIG_FILE: &str = "c-docgen.toml";
pub const DEFAULT_PROJECT_NAME: &str = "Documentation";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Shown on every page and used as the index title
    pub project_name: Option<String>,
    /// Passed to the front end for every translation unit
    pub compiler_args: Vec<String>,
    /// Added as `-I` arguments
    pub include_dirs: Vec<PathBuf>,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DocError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DocError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Loads `explicit` if given, otherwise `c-docgen.toml` in the current
    /// directory when it exists. A missing default file yields the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = Path::new(CONFIG_FILE);
        if default.is_file() {
            debug!("Using {}", default.display());
            Self::load(default)
        } else {
            Ok(Self::default())
        }
    }

    /// The project name, with `cli` taking precedence.
    pub fn project_name(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.project_name.clone())
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
    }

    /// Front-end arguments: configured include dirs, then configured
    /// arguments, then the ones given on the command line.
    pub fn compiler_args(&self, cli: &[String]) -> Vec<String> {
        let mut args: Vec<String> = self
            .include_dirs
            .iter()
            .map(|dir| format!("-I{}", dir.display()))
            .collect();
        args.extend(self.compiler_args.iter().cloned());
        args.extend(cli.iter().cloned());
        args
    }
}
