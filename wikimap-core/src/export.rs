// Rendering of mapped graphs and trees, and saving them to disk

use crate::error::StorageError;
use crate::graph::WikiGraph;
use crate::tree::{NodeId, PageTree};
use chrono::Local;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const MAX_FILENAME_LENGTH: usize = 255;
pub const DEFAULT_FILENAME: &str = "wikipedia_content";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
    Dot,
    Markdown,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ExportFormat::Text),
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "dot" => Some(ExportFormat::Dot),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Dot => "dot",
            ExportFormat::Markdown => "md",
        }
    }

    /// Format a tree is actually rendered in: JSON stays JSON, anything else is text.
    pub fn for_tree(self) -> ExportFormat {
        match self {
            ExportFormat::Json => ExportFormat::Json,
            _ => ExportFormat::Text,
        }
    }
}

pub fn render_graph(graph: &WikiGraph, format: ExportFormat) -> Result<String, StorageError> {
    match format {
        ExportFormat::Text => Ok(generate_text_summary(graph)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(graph)?),
        ExportFormat::Csv => Ok(generate_csv(graph)),
        ExportFormat::Dot => Ok(generate_dot(graph)),
        ExportFormat::Markdown => Ok(generate_markdown(graph)),
    }
}

/// Trees only have a text and a JSON rendering; other formats fall back to text.
pub fn render_tree(tree: &PageTree, format: ExportFormat) -> Result<String, StorageError> {
    match format.for_tree() {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(tree)?),
        _ => Ok(generate_tree_text(tree)),
    }
}

pub fn generate_text_summary(graph: &WikiGraph) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("                      LINK MAP: {}\n", graph.root_title()));
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Root:         {}\n", graph.root_title()));
    report.push_str(&format!("Pages:        {}\n", graph.total_nodes()));
    report.push_str(&format!("Links:        {}\n", graph.edges().len()));
    report.push_str(&format!("Errors:       {}\n", graph.error_count()));
    report.push_str(&format!("Depth:        {}\n\n", graph.max_depth_explored()));

    report.push_str(RULE);
    report.push_str("\nLINKS\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    for edge in graph.edges() {
        report.push_str(&format!("{} -[{}]-> {}\n", edge.source, edge.rel_type, edge.target));
    }
    report.push('\n');

    report
}

pub fn generate_csv(graph: &WikiGraph) -> String {
    let mut out = String::from("source,target,rel_type\n");
    for edge in graph.edges() {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&edge.source),
            csv_field(&edge.target),
            csv_field(edge.rel_type.as_str())
        ));
    }
    out
}

/// Graphviz rendering. Node labels are titles, edge labels relation types.
pub fn generate_dot(graph: &WikiGraph) -> String {
    let mut dot_graph: DiGraph<String, String> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for node in graph.nodes() {
        let index = dot_graph.add_node(node.title.clone());
        indices.insert(node.title.as_str(), index);
    }
    for edge in graph.edges() {
        if let (Some(&from), Some(&to)) = (
            indices.get(edge.source.as_str()),
            indices.get(edge.target.as_str()),
        ) {
            dot_graph.add_edge(from, to, edge.rel_type.to_string());
        }
    }

    format!("{}", Dot::with_config(&dot_graph, &[]))
}

pub fn generate_markdown(graph: &WikiGraph) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Link map: {}\n\n", graph.root_title()));

    md.push_str("| Metric | Value |\n|---|---|\n");
    md.push_str(&format!("| Pages | {} |\n", graph.total_nodes()));
    md.push_str(&format!("| Links | {} |\n", graph.edges().len()));
    md.push_str(&format!("| Errors | {} |\n", graph.error_count()));
    md.push_str(&format!("| Depth | {} |\n\n", graph.max_depth_explored()));

    md.push_str("## Links\n\n| Source | Target | Type |\n|---|---|---|\n");
    for edge in graph.edges() {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            md_cell(&edge.source),
            md_cell(&edge.target),
            edge.rel_type
        ));
    }
    md
}

pub fn generate_tree_text(tree: &PageTree) -> String {
    let mut out = String::new();
    out.push_str(&tree.root().title);
    out.push('\n');
    write_children(tree, PageTree::ROOT, "", &mut out);
    out.push_str(&format!(
        "\n{} pages, {} errors, depth {}\n",
        tree.total_nodes(),
        tree.error_count(),
        tree.max_depth_reached()
    ));
    out
}

fn write_children(tree: &PageTree, id: NodeId, prefix: &str, out: &mut String) {
    let children: Vec<_> = tree.children(id).collect();
    let count = children.len();
    for (i, (child, node)) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        out.push_str(&format!("{}{}{}\n", prefix, branch, node.title));

        let extension = if last { "    " } else { "│   " };
        write_children(tree, child, &format!("{}{}", prefix, extension), out);
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn md_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Writes rendered output into a directory with timestamped filenames.
pub struct FileSaver {
    output_dir: PathBuf,
    timestamp_format: String,
}

impl FileSaver {
    /// Creates `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|source| {
            error!("Error creating directory {}: {}", output_dir.display(), source);
            StorageError::DirectoryCreation {
                path: output_dir.clone(),
                source,
            }
        })?;
        info!("Storage directory ready: {}", output_dir.display());

        Ok(Self {
            output_dir,
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
        })
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Replaces anything outside `[A-Za-z0-9_.-]` with `_` and caps the length.
    pub fn sanitize_filename(filename: &str) -> Result<String, StorageError> {
        let clean: String = filename
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_FILENAME_LENGTH)
            .collect();

        if clean.is_empty() {
            return Err(StorageError::InvalidFilename(
                "Filename is invalid after sanitization (empty string)".to_string(),
            ));
        }
        Ok(clean)
    }

    /// `<timestamp>_<title>.<ext>`, with the title shortened so the whole
    /// name stays within [`MAX_FILENAME_LENGTH`].
    pub fn generate_filename(&self, title: Option<&str>, extension: &str) -> String {
        let timestamp = Local::now().format(&self.timestamp_format).to_string();
        let budget = MAX_FILENAME_LENGTH.saturating_sub(timestamp.len() + 2 + extension.len());

        if let Some(title) = title
            && !title.is_empty()
        {
            match Self::sanitize_filename(title) {
                Ok(safe) if budget > 0 => {
                    // sanitized names are ASCII, so byte and char counts agree
                    let safe = &safe[..safe.len().min(budget)];
                    return format!("{}_{}.{}", timestamp, safe, extension);
                }
                Ok(_) => warn!("Timestamp leaves no room for the title, using default filename"),
                Err(_) => warn!("Invalid title provided, using default filename"),
            }
        }
        format!("{}_{}.{}", timestamp, DEFAULT_FILENAME, extension)
    }

    pub fn save(
        &self,
        content: &str,
        title: Option<&str>,
        extension: &str,
    ) -> Result<PathBuf, StorageError> {
        let path = self.output_dir.join(self.generate_filename(title, extension));
        fs::write(&path, content).map_err(|source| {
            error!("Error writing file {}: {}", path.display(), source);
            StorageError::FileWrite {
                path: path.clone(),
                source,
            }
        })?;
        info!("Successfully saved file: {}", path.display());

        match fs::read_to_string(&path) {
            Ok(saved) if saved != content => {
                warn!("Content discrepancy detected after saving {}", path.display())
            }
            Ok(_) => {}
            Err(e) => error!("Error validating saved file {}: {}", path.display(), e),
        }

        Ok(path)
    }
}
