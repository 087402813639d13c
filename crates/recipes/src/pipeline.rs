//! # Recipe Pipeline
//!
//! Recipes form a dependency graph: an edge `a -> b` means `b` requires `a`.
//! The run order is a topological sort of that graph. Among recipes that are
//! ready at the same time, the one declared first wins, so the order is
//! stable for a given input list.

use crate::Recipe;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use scribe::{ArtifactReport, Scribe, ScribeError};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unknown recipe `{0}`")]
    UnknownRecipe(String),
    #[error("recipe `{recipe}` requires unknown recipe `{dependency}`")]
    UnknownDependency { recipe: String, dependency: String },
    #[error("recipe `{0}` is defined more than once")]
    DuplicateRecipe(String),
    #[error("dependency cycle through recipe `{0}`")]
    Cycle(String),
    #[error("recipe `{recipe}` failed: {source}")]
    Recipe {
        recipe: String,
        #[source]
        source: ScribeError,
    },
}

/// Validated, ordered set of recipes.
#[derive(Debug)]
pub struct Pipeline {
    recipes: Vec<Recipe>,
    /// Node weight is the recipe's index in `recipes`.
    graph: DiGraph<usize, ()>,
    by_name: HashMap<String, NodeIndex>,
    order: Vec<usize>,
}

impl Pipeline {
    /// Builds the dependency graph and computes the run order.
    ///
    /// # Errors
    /// `DuplicateRecipe`, `UnknownDependency` or `Cycle`.
    pub fn new(recipes: Vec<Recipe>) -> Result<Self, PipelineError> {
        let mut graph = DiGraph::with_capacity(recipes.len(), recipes.len());
        let mut by_name = HashMap::with_capacity(recipes.len());

        for (i, recipe) in recipes.iter().enumerate() {
            let node = graph.add_node(i);
            if by_name.insert(recipe.name.clone(), node).is_some() {
                return Err(PipelineError::DuplicateRecipe(recipe.name.clone()));
            }
        }

        for (i, recipe) in recipes.iter().enumerate() {
            for dep in &recipe.requires {
                let from = by_name.get(dep).copied().ok_or_else(|| {
                    PipelineError::UnknownDependency {
                        recipe: recipe.name.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                graph.add_edge(from, NodeIndex::new(i), ());
            }
        }

        petgraph::algo::toposort(&graph, None)
            .map_err(|cycle| PipelineError::Cycle(recipes[graph[cycle.node_id()]].name.clone()))?;

        let order = stable_order(&graph);
        Ok(Self {
            recipes,
            graph,
            by_name,
            order,
        })
    }

    /// Pipeline over the built-in catalog.
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::new(crate::catalog::builtin())
    }

    /// Recipes as declared.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Every recipe in run order.
    pub fn order(&self) -> Vec<&Recipe> {
        self.order.iter().map(|&i| &self.recipes[i]).collect()
    }

    /// The named recipes plus everything they transitively require, in run
    /// order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Recipe>, PipelineError> {
        let mut wanted: HashSet<usize> = HashSet::new();
        let mut stack = Vec::new();
        for name in names {
            let node = self
                .by_name
                .get(name.as_ref())
                .copied()
                .ok_or_else(|| PipelineError::UnknownRecipe(name.as_ref().to_string()))?;
            stack.push(node);
        }

        while let Some(node) = stack.pop() {
            if wanted.insert(self.graph[node]) {
                stack.extend(self.graph.neighbors_directed(node, Direction::Incoming));
            }
        }

        Ok(self
            .order
            .iter()
            .filter(|&&i| wanted.contains(&i))
            .map(|&i| &self.recipes[i])
            .collect())
    }
}

/// Kahn's algorithm with a min-heap on declaration index.
fn stable_order(graph: &DiGraph<usize, ()>) -> Vec<usize> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|n| Reverse(n.index()))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(graph[NodeIndex::new(i)]);
        for next in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }
    order
}

/// What one recipe did.
#[derive(Debug, Clone)]
pub struct RecipeReport {
    pub recipe: String,
    pub artifact: ArtifactReport,
}

impl RecipeReport {
    pub fn changed(&self) -> bool {
        self.artifact.written
    }
}

/// Applies `recipes` in the given order.
///
/// Aborts at the first failing recipe. Artifacts written by earlier recipes
/// stay written.
pub fn run<'a, I>(scribe: &Scribe, recipes: I) -> Result<Vec<RecipeReport>, PipelineError>
where
    I: IntoIterator<Item = &'a Recipe>,
{
    let mut reports = Vec::new();
    for recipe in recipes {
        let artifact = scribe
            .patch(&recipe.artifact, &recipe.patches)
            .map_err(|source| {
                warn!(recipe = %recipe.name, error = %source, "recipe failed, stopping");
                PipelineError::Recipe {
                    recipe: recipe.name.clone(),
                    source,
                }
            })?;
        info!(
            recipe = %recipe.name,
            artifact = %recipe.artifact.display(),
            written = artifact.written,
            "recipe applied"
        );
        reports.push(RecipeReport {
            recipe: recipe.name.clone(),
            artifact,
        });
    }
    Ok(reports)
}
