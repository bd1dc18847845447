//! Where the entity manager looks for entity type files.
//!
//! Configure it builder-style, or load it from a JSON file:
//!
//! ```ignore
//! let config = ManagerConfig::new("assets/entities").extension("json");
//! let config = ManagerConfig::from_json_file("runa.json")?;
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EcsError, Result};

/// Default location of entity type files, relative to the working directory.
pub const DEFAULT_ENTITY_DIR: &str = "data/json/entities";

/// Settings for [`EntityManager::initialize`](crate::ecs::EntityManager::initialize).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directories scanned for entity type files, in order.
    pub entity_dirs: Vec<PathBuf>,
    /// File extension of entity type files, without the dot.
    pub extension: String,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            entity_dirs: vec![PathBuf::from(DEFAULT_ENTITY_DIR)],
            extension: "json".to_string(),
            recursive: true,
        }
    }
}

impl ManagerConfig {
    /// Configuration scanning a single directory.
    pub fn new(entity_dir: impl Into<PathBuf>) -> Self {
        Self {
            entity_dirs: vec![entity_dir.into()],
            ..Self::default()
        }
    }

    /// Scan another directory after the ones already configured.
    pub fn entity_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.entity_dirs.push(dir.into());
        self
    }

    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Read a configuration from a JSON object. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EcsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| EcsError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns `true` if `path` has the configured entity file extension.
    pub(crate) fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
