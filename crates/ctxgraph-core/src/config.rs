//! Build options for graph construction.
//!
//! Options come from three layers, later ones winning: defaults, an optional
//! JSON file, then `CTXGRAPH_*` environment variables. The CLI applies its own
//! flags on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, GraphResult};

pub const ENV_REPRESENT_EXTERNAL_IMPORTS: &str = "CTXGRAPH_REPRESENT_EXTERNAL_IMPORTS";
pub const ENV_ROOT: &str = "CTXGRAPH_ROOT";
pub const ENV_WORKERS: &str = "CTXGRAPH_WORKERS";

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Create a synthetic `external` node for includes that do not resolve
    /// to a loaded record instead of dropping the edge.
    pub represent_external_imports: bool,
    /// Base for relative record paths and project-root-relative includes.
    pub root_directory: Option<PathBuf>,
    /// Extra include search directories, tried after the root directory.
    pub include_dirs: Vec<PathBuf>,
    /// Worker threads used to parse record files.
    pub workers: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            represent_external_imports: false,
            root_directory: None,
            include_dirs: Vec::new(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl BuildOptions {
    /// Read options from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> GraphResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| GraphError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `CTXGRAPH_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> GraphResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> GraphResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_REPRESENT_EXTERNAL_IMPORTS) {
            self.represent_external_imports = parse_flag(&val);
        }
        if let Some(val) = lookup(ENV_ROOT) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                self.root_directory = Some(PathBuf::from(trimmed));
            }
        }
        if let Some(val) = lookup(ENV_WORKERS) {
            self.workers = val
                .trim()
                .parse::<usize>()
                .map_err(|e| GraphError::Config(format!("{ENV_WORKERS}={val:?}: {e}")))?;
        }
        Ok(self)
    }

    /// Root directory as a `/`-separated string, if configured.
    pub fn root_str(&self) -> Option<String> {
        self.root_directory
            .as_ref()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }
}

fn parse_flag(val: &str) -> bool {
    let v = val.trim().to_lowercase();
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}
