//! Page link graph and the store operations that mutate it.
//!
//! A [`WikiGraph`] is keyed by exact page title. Every mutation goes through
//! the methods here so the structural invariants hold: one node per title,
//! edges only between existing nodes, counters in step with the node map.

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::trace;

/// Opaque key/value bag attached to nodes and edges.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Prefix of the synthetic node recorded when a page's links can't be fetched.
pub const ERROR_PREFIX: &str = "[ERROR] ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    #[default]
    LinksTo,
    Error,
    Other(String),
}

impl RelationType {
    pub fn as_str(&self) -> &str {
        match self {
            RelationType::LinksTo => "LINKS_TO",
            RelationType::Error => "ERROR",
            RelationType::Other(name) => name,
        }
    }
}

impl From<String> for RelationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "LINKS_TO" => RelationType::LinksTo,
            "ERROR" => RelationType::Error,
            _ => RelationType::Other(value),
        }
    }
}

impl From<&str> for RelationType {
    fn from(value: &str) -> Self {
        RelationType::from(value.to_string())
    }
}

impl From<RelationType> for String {
    fn from(value: RelationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiNode {
    pub title: String,
    /// Synthetic failure marker rather than a real page.
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiEdge {
    pub source: String,
    pub target: String,
    pub rel_type: RelationType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct WikiGraph {
    root_title: String,
    total_nodes: usize,
    error_count: usize,
    max_depth_explored: usize,
    nodes: BTreeMap<String, WikiNode>,
    edges: Vec<WikiEdge>,
}

impl WikiGraph {
    /// Creates a graph holding only the root node.
    pub fn new(root_title: &str) -> Result<Self, GraphError> {
        validate_title(root_title, "root")?;
        let mut graph = Self::empty(root_title);
        graph.add_node(root_title, false, Metadata::new())?;
        Ok(graph)
    }

    /// Rebuilds a graph from stored parts through the regular store
    /// operations. Any inconsistency is reported as [`GraphError::Creation`].
    pub fn from_parts(
        root_title: &str,
        nodes: Vec<WikiNode>,
        edges: Vec<WikiEdge>,
        max_depth_explored: usize,
    ) -> Result<Self, GraphError> {
        if root_title.is_empty() {
            return Err(GraphError::Creation("root title is empty".to_string()));
        }

        let mut graph = Self::empty(root_title);
        for node in nodes {
            graph
                .add_node(&node.title, node.is_error, node.metadata)
                .map_err(|e| GraphError::Creation(e.to_string()))?;
        }
        if !graph.nodes.contains_key(root_title) {
            return Err(GraphError::Creation(format!(
                "root node '{}' is missing",
                root_title
            )));
        }
        for edge in edges {
            graph
                .add_relationship(&edge.source, &edge.target, edge.rel_type, edge.metadata)
                .map_err(|e| GraphError::Creation(e.to_string()))?;
        }
        graph.update_metrics(max_depth_explored);
        Ok(graph)
    }

    fn empty(root_title: &str) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            root_title: root_title.to_string(),
            total_nodes: 0,
            error_count: 0,
            max_depth_explored: 0,
        }
    }

    /// Adds `title` unless already present. Existing nodes are returned
    /// untouched and the counters do not move.
    pub fn add_node(
        &mut self,
        title: &str,
        is_error: bool,
        metadata: Metadata,
    ) -> Result<&WikiNode, GraphError> {
        validate_title(title, "node")?;

        if !self.nodes.contains_key(title) {
            trace!("Adding node '{}' (error: {})", title, is_error);
            self.nodes.insert(
                title.to_string(),
                WikiNode {
                    title: title.to_string(),
                    is_error,
                    metadata,
                },
            );
            self.total_nodes += 1;
            if is_error {
                self.error_count += 1;
            }
        }

        Ok(&self.nodes[title])
    }

    /// Appends an edge between two existing nodes. Parallel edges are kept.
    pub fn add_relationship(
        &mut self,
        source_title: &str,
        target_title: &str,
        rel_type: RelationType,
        metadata: Metadata,
    ) -> Result<&WikiEdge, GraphError> {
        validate_title(source_title, "source")?;
        validate_title(target_title, "target")?;

        if !self.nodes.contains_key(source_title) {
            return Err(GraphError::Node(format!(
                "source node '{}' not found in graph",
                source_title
            )));
        }
        if !self.nodes.contains_key(target_title) {
            return Err(GraphError::Node(format!(
                "target node '{}' not found in graph",
                target_title
            )));
        }
        if rel_type.as_str().is_empty() {
            return Err(GraphError::Relationship(format!(
                "empty relation type for '{}' -> '{}'",
                source_title, target_title
            )));
        }

        trace!("Adding edge '{}' -[{}]-> '{}'", source_title, rel_type, target_title);
        let index = self.edges.len();
        self.edges.push(WikiEdge {
            source: source_title.to_string(),
            target: target_title.to_string(),
            rel_type,
            metadata,
        });
        Ok(&self.edges[index])
    }

    /// Ensures `target_title` exists, then records a `LINKS_TO` edge.
    pub fn add_link(&mut self, source_title: &str, target_title: &str) -> Result<&WikiEdge, GraphError> {
        self.add_node(target_title, false, Metadata::new())?;
        self.add_relationship(source_title, target_title, RelationType::LinksTo, Metadata::new())
    }

    /// Records `[ERROR] <source>` as an error node linked from `source_title`.
    pub fn add_error_node(&mut self, source_title: &str) -> Result<&WikiEdge, GraphError> {
        validate_title(source_title, "source")?;
        if !self.nodes.contains_key(source_title) {
            return Err(GraphError::Node(format!(
                "source node '{}' not found in graph",
                source_title
            )));
        }

        let error_title = error_title(source_title);
        self.add_node(&error_title, true, Metadata::new())?;
        self.add_relationship(source_title, &error_title, RelationType::Error, Metadata::new())
    }

    pub fn update_metrics(&mut self, depth: usize) {
        self.max_depth_explored = self.max_depth_explored.max(depth);
    }

    pub fn root_title(&self) -> &str {
        &self.root_title
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn max_depth_explored(&self) -> usize {
        self.max_depth_explored
    }

    pub fn contains(&self, title: &str) -> bool {
        self.nodes.contains_key(title)
    }

    /// Nodes ordered by title.
    pub fn nodes(&self) -> impl Iterator<Item = &WikiNode> {
        self.nodes.values()
    }

    /// Edges in the order they were recorded.
    pub fn edges(&self) -> &[WikiEdge] {
        &self.edges
    }

    pub fn get_node(&self, title: &str) -> Option<&WikiNode> {
        self.nodes.get(title)
    }

    pub fn get_outgoing_edges(&self, source_title: &str) -> Vec<&WikiEdge> {
        self.edges.iter().filter(|e| e.source == source_title).collect()
    }

    pub fn get_incoming_edges(&self, target_title: &str) -> Vec<&WikiEdge> {
        self.edges.iter().filter(|e| e.target == target_title).collect()
    }

    /// Titles adjacent to `title` in either direction.
    pub fn get_connected_nodes(&self, title: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter_map(|e| {
                if e.source == title {
                    Some(e.target.as_str())
                } else if e.target == title {
                    Some(e.source.as_str())
                } else {
                    None
                }
            })
            .collect()
    }
}

pub fn error_title(source_title: &str) -> String {
    format!("{}{}", ERROR_PREFIX, source_title)
}

pub(crate) fn validate_title(title: &str, role: &str) -> Result<(), GraphError> {
    if title.is_empty() {
        return Err(GraphError::InvalidTitle(format!(
            "{} title must be a non-empty string",
            role
        )));
    }
    Ok(())
}
