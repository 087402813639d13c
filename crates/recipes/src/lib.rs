//! Recipes: named groups of patches against one artifact.
//!
//! A [`Recipe`] targets a single file relative to the artifact root and may
//! declare the recipes it depends on. [`Pipeline`] orders them so that every
//! dependency runs first; [`run`] applies them through a [`scribe::Scribe`].

pub mod catalog;
pub mod manifest;
pub mod pipeline;
pub mod templates;

use common::Patch;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use manifest::{load as load_manifest, plan, ManifestError};
pub use pipeline::{run, Pipeline, PipelineError, RecipeReport};
pub use templates::Template;

/// Ordered patches for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Path relative to the artifact root.
    pub artifact: PathBuf,
    /// Recipes that must run before this one.
    #[serde(default)]
    pub requires: Vec<String>,
    pub patches: Vec<Patch>,
}
