//! JSON plan manifests.
//!
//! A manifest file holds either one recipe object or `{"recipes": [...]}`.
//! Pointing [`load`] at a directory reads every `*.json` beneath it in file
//! name order.

use crate::pipeline::{Pipeline, PipelineError};
use crate::Recipe;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("no recipes found under {}", path.display())]
    Empty { path: PathBuf },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Many { recipes: Vec<Recipe> },
    One(Recipe),
}

/// Reads recipes from a manifest file or a directory of them.
pub fn load(path: &Path) -> Result<Vec<Recipe>, ManifestError> {
    if !path.is_dir() {
        return load_file(path);
    }

    let mut recipes = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| ManifestError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        let file = entry.path();
        if entry.file_type().is_file() && file.extension().and_then(|s| s.to_str()) == Some("json") {
            recipes.extend(load_file(file)?);
        }
    }
    info!(dir = %path.display(), count = recipes.len(), "manifests loaded");
    Ok(recipes)
}

fn load_file(path: &Path) -> Result<Vec<Recipe>, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ManifestFile =
        serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let recipes = match parsed {
        ManifestFile::Many { recipes } => recipes,
        ManifestFile::One(recipe) => vec![recipe],
    };
    debug!(file = %path.display(), count = recipes.len(), "manifest parsed");
    Ok(recipes)
}

/// Manifest recipes resolved against the built-in catalog.
#[derive(Debug)]
pub struct Plan {
    pub pipeline: Pipeline,
    /// Recipes named by the manifests.
    pub names: Vec<String>,
}

impl Plan {
    /// Manifest recipes plus their dependencies, in run order.
    pub fn recipes(&self) -> Result<Vec<&Recipe>, PipelineError> {
        self.pipeline.select(&self.names)
    }
}

/// Loads manifests from `path` and builds a pipeline in which they may
/// `require` built-in recipes. A manifest recipe replaces a built-in one of
/// the same name.
pub fn plan(path: &Path) -> Result<Plan, ManifestError> {
    let loaded = load(path)?;
    if loaded.is_empty() {
        return Err(ManifestError::Empty {
            path: path.to_path_buf(),
        });
    }
    let names: Vec<String> = loaded.iter().map(|r| r.name.clone()).collect();

    let mut recipes: Vec<Recipe> = crate::catalog::builtin()
        .into_iter()
        .filter(|r| !names.contains(&r.name))
        .collect();
    recipes.extend(loaded);

    Ok(Plan {
        pipeline: Pipeline::new(recipes)?,
        names,
    })
}
