//! Model dependency graph construction and lineage slicing
//!
//! The graph is built once per model batch and sliced per model into a
//! display-oriented lineage: the model's ancestor/descendant family, each
//! node with its direct (one-hop) dependencies only.

use std::collections::{HashMap, HashSet, VecDeque};

use vantage_core::{LineageGraph, LineageNodeDependency, LineageNodeKind};

use crate::model::Model;

/// Directed dependency graph over models, with forward and reverse edges
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// node -> the nodes it depends on (upstream)
    parents: HashMap<String, Vec<String>>,

    /// node -> the nodes that depend on it (downstream)
    children: HashMap<String, Vec<String>>,

    /// node metadata by unique id
    nodes: HashMap<String, LineageNodeDependency>,
}

impl DependencyGraph {
    /// Build a graph from a model batch.
    ///
    /// Every model becomes a node tagged `model`. Dependency identifiers
    /// that do not resolve to a model in the batch (seeds, sources, models
    /// filtered out upstream) are dropped - they are not graph nodes here.
    pub fn from_models(models: &[Model]) -> Self {
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut nodes: HashMap<String, LineageNodeDependency> = HashMap::new();

        for model in models {
            nodes.insert(
                model.unique_id.clone(),
                LineageNodeDependency {
                    kind: LineageNodeKind::Model,
                    name: model.name.clone(),
                },
            );
        }

        for model in models {
            for dep_id in &model.depends_on {
                if !nodes.contains_key(dep_id) {
                    continue;
                }
                parents
                    .entry(model.unique_id.clone())
                    .or_default()
                    .push(dep_id.clone());
                children
                    .entry(dep_id.clone())
                    .or_default()
                    .push(model.unique_id.clone());
            }
        }

        Self {
            parents,
            children,
            nodes,
        }
    }

    /// Node metadata by unique id
    pub fn node(&self, node_id: &str) -> Option<&LineageNodeDependency> {
        self.nodes.get(node_id)
    }

    /// Immediate dependencies (one hop upstream) of a node
    pub fn direct_dependencies(&self, node_id: &str) -> &[String] {
        self.parents.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Immediate dependents (one hop downstream) of a node
    pub fn direct_dependents(&self, node_id: &str) -> &[String] {
        self.children.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All upstream nodes (transitive closure of dependencies)
    pub fn upstream(&self, node_id: &str) -> Vec<String> {
        self.closure(node_id, &self.parents)
    }

    /// All downstream nodes (transitive closure of dependents)
    pub fn downstream(&self, node_id: &str) -> Vec<String> {
        self.closure(node_id, &self.children)
    }

    fn closure(&self, node_id: &str, edges: &HashMap<String, Vec<String>>) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        if let Some(next) = edges.get(node_id) {
            queue.extend(next.iter().cloned());
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(next) = edges.get(&current) {
                for node in next {
                    if !visited.contains(node) {
                        queue.push_back(node.clone());
                    }
                }
            }
            result.push(current);
        }

        result
    }
}

/// Slice the full graph down to one model's lineage.
///
/// The slice covers the model's ancestors, descendants, and the model
/// itself; each entry maps the node's display name to its direct
/// dependencies - one hop, not the transitive closure.
pub fn slice_lineage(graph: &DependencyGraph, model_id: &str) -> LineageGraph {
    let mut family = graph.upstream(model_id);
    family.extend(graph.downstream(model_id));
    family.push(model_id.to_string());

    let mut lineage = LineageGraph::new();
    for node_id in family {
        let Some(node) = graph.node(&node_id) else {
            continue;
        };
        let dependencies = graph
            .direct_dependencies(&node_id)
            .iter()
            .filter_map(|dep_id| graph.node(dep_id).cloned())
            .collect();
        lineage.insert(node.name.clone(), dependencies);
    }
    lineage
}
