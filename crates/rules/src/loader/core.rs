//! Core [`DefinitionLoader`]: filesystem-backed definition loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::schema::EventDefinition;

use super::error::{LoadResult, LoadStatus, Result};

/// Scans a directory (recursively) for `*.yml` / `*.yaml` files and keeps
/// the parsed [`EventDefinition`]s keyed by `metadata.id`.
pub struct DefinitionLoader {
    definitions_dir: PathBuf,
    definitions: Arc<RwLock<HashMap<String, EventDefinition>>>,
}

impl DefinitionLoader {
    pub fn new(definitions_dir: PathBuf) -> Self {
        Self {
            definitions_dir,
            definitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load every definition under the directory.
    ///
    /// Parse errors are reported per file and do not abort the scan. A
    /// missing directory yields no results.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.definitions_dir, &mut results)?;
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        // Deterministic load order; a later duplicate id replaces an earlier one.
        paths.sort();

        for path in paths {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(skipped(path, "dotfile"));
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                results.push(skipped(path, "not a YAML file"));
                continue;
            }

            match self.load_file(&path) {
                Ok(definition) if !definition.metadata.enabled => {
                    info!(definition_id = %definition.id(), path = %path.display(), "definition disabled, skipping");
                    results.push(skipped(path, "disabled"));
                }
                Ok(definition) => {
                    let definition_id = definition.id().to_string();
                    info!(
                        definition_id = %definition_id,
                        stream = %definition.config.stream(),
                        path = %path.display(),
                        "loaded definition"
                    );
                    self.write_map().insert(definition_id.clone(), definition);
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { definition_id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load definition file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a single YAML file.
    pub fn load_file(&self, path: &Path) -> Result<EventDefinition> {
        let contents = fs::read_to_string(path)?;
        EventDefinition::from_yaml_str(&contents)
    }

    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    pub fn get(&self, id: &str) -> Option<EventDefinition> {
        self.read_map().get(id).cloned()
    }

    /// Snapshot of all loaded definitions, sorted by id.
    pub fn definitions(&self) -> Vec<EventDefinition> {
        let mut all: Vec<EventDefinition> = self.read_map().values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, EventDefinition>> {
        self.definitions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, EventDefinition>> {
        self.definitions.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn skipped(path: PathBuf, reason: &str) -> LoadResult {
    LoadResult {
        path,
        status: LoadStatus::Skipped {
            reason: reason.to_string(),
        },
    }
}
