use crate::error::{GraphError, ServiceError};
use crate::graph::{WikiGraph, error_title, validate_title};
use crate::source::LinkSource;
use crate::tree::{NodeId, PageTree};
use std::collections::HashSet;
use std::sync::Arc;
use std::vec;
use tracing::{debug, error, info, warn};

/// Called with `(depth, title)` each time a page is expanded.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Depth-bounded, cycle-safe walk over the links returned by a [`LinkSource`].
///
/// Pages are expanded depth-first in the order their links are returned. Each
/// title is expanded at most once per call. A page at depth `d` records every
/// outgoing link but only expands targets when `d < max_depth`.
pub struct PageMapper<'a, S: LinkSource> {
    source: &'a S,
    progress_callback: Option<ProgressCallback>,
}

impl<'a, S: LinkSource> PageMapper<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Maps the link graph reachable from `root_title` within `max_depth` levels.
    pub fn map(
        &self,
        root_title: &str,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<WikiGraph, ServiceError> {
        info!("Mapping page graph for '{}' (depth: {})", root_title, max_depth);
        check_depth(max_depth)?;

        let mut recorder = GraphRecorder {
            graph: WikiGraph::new(root_title).map_err(critical)?,
        };
        self.walk(&mut recorder, root_title, max_depth, include_errors)?;

        let graph = recorder.graph;
        info!(
            "Mapped '{}': {} nodes, {} edges, {} errors, depth {}",
            root_title,
            graph.total_nodes(),
            graph.edges().len(),
            graph.error_count(),
            graph.max_depth_explored()
        );
        Ok(graph)
    }

    /// Maps the tree of first discoveries reachable from `root_title`.
    ///
    /// Links to pages that were already expanded are left out.
    pub fn map_tree(
        &self,
        root_title: &str,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<PageTree, ServiceError> {
        info!("Mapping page tree for '{}' (depth: {})", root_title, max_depth);
        check_depth(max_depth)?;
        validate_title(root_title, "root").map_err(critical)?;

        let mut recorder = TreeRecorder {
            tree: PageTree::new(root_title),
        };
        self.walk(&mut recorder, root_title, max_depth, include_errors)?;

        let tree = recorder.tree;
        info!(
            "Mapped tree for '{}': {} nodes, {} errors",
            root_title,
            tree.total_nodes(),
            tree.error_count()
        );
        Ok(tree)
    }

    fn walk<R: Recorder>(
        &self,
        recorder: &mut R,
        root_title: &str,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<(), ServiceError> {
        let mut traversal = Traversal {
            visited: HashSet::new(),
            max_depth,
            include_errors,
        };

        let root = recorder.root();
        let mut stack: Vec<Frame<R::Id>> = Vec::new();
        if let Some(frame) = self.expand(recorder, &mut traversal, root, root_title, 1)? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(link) = frame.pending.next() else {
                stack.pop();
                continue;
            };
            let parent = frame.id.clone();
            let depth = frame.depth;

            let already_visited = traversal.visited.contains(&link);
            let child = recorder
                .record_link(&parent, &link, already_visited)
                .map_err(critical)?;

            if let Some(child) = child
                && !already_visited
                && depth < traversal.max_depth
                && let Some(next) = self.expand(recorder, &mut traversal, child, &link, depth + 1)?
            {
                stack.push(next);
            }
        }

        Ok(())
    }

    /// Marks `title` visited and fetches its links.
    ///
    /// Returns `None` when there is nothing to descend into.
    fn expand<R: Recorder>(
        &self,
        recorder: &mut R,
        traversal: &mut Traversal,
        id: R::Id,
        title: &str,
        depth: usize,
    ) -> Result<Option<Frame<R::Id>>, ServiceError> {
        if depth > traversal.max_depth {
            return Ok(None);
        }
        if !traversal.visited.insert(title.to_string()) {
            debug!("Skipping already visited page: {}", title);
            return Ok(None);
        }

        recorder.visit(&id, depth);
        debug!("Processing page: {} (depth {})", title, depth);
        if let Some(ref callback) = self.progress_callback {
            callback(depth, title.to_string());
        }

        match self.source.fetch_links(title) {
            Ok(links) => Ok(Some(Frame {
                id,
                depth,
                pending: links.into_iter(),
            })),
            Err(e) => {
                warn!("Error retrieving links for {}: {}", title, e);
                if traversal.include_errors {
                    recorder.record_failure(&id, title).map_err(critical)?;
                }
                Ok(None)
            }
        }
    }
}

fn check_depth(max_depth: usize) -> Result<(), ServiceError> {
    if max_depth < 1 {
        return Err(ServiceError::page_mapping("Depth must be at least 1"));
    }
    Ok(())
}

fn critical(e: GraphError) -> ServiceError {
    error!("Critical mapping error: {}", e);
    ServiceError::mapping_failed(e)
}

/// Per-call traversal state.
struct Traversal {
    visited: HashSet<String>,
    max_depth: usize,
    include_errors: bool,
}

/// A page whose links are still being recorded.
struct Frame<Id> {
    id: Id,
    depth: usize,
    pending: vec::IntoIter<String>,
}

/// Output structure built while walking.
trait Recorder {
    type Id: Clone;

    fn root(&self) -> Self::Id;

    fn visit(&mut self, id: &Self::Id, depth: usize);

    fn record_failure(&mut self, id: &Self::Id, title: &str) -> Result<(), GraphError>;

    /// Records `link` found on `parent`. Returns the id to expand it under, if any.
    fn record_link(
        &mut self,
        parent: &Self::Id,
        link: &str,
        already_visited: bool,
    ) -> Result<Option<Self::Id>, GraphError>;
}

struct GraphRecorder {
    graph: WikiGraph,
}

impl Recorder for GraphRecorder {
    type Id = String;

    fn root(&self) -> String {
        self.graph.root_title().to_string()
    }

    fn visit(&mut self, _id: &String, depth: usize) {
        self.graph.update_metrics(depth);
    }

    fn record_failure(&mut self, id: &String, _title: &str) -> Result<(), GraphError> {
        self.graph.add_error_node(id)?;
        Ok(())
    }

    fn record_link(
        &mut self,
        parent: &String,
        link: &str,
        _already_visited: bool,
    ) -> Result<Option<String>, GraphError> {
        self.graph.add_link(parent, link)?;
        Ok(Some(link.to_string()))
    }
}

struct TreeRecorder {
    tree: PageTree,
}

impl Recorder for TreeRecorder {
    type Id = NodeId;

    fn root(&self) -> NodeId {
        PageTree::ROOT
    }

    fn visit(&mut self, _id: &NodeId, depth: usize) {
        self.tree.update_metrics(depth);
    }

    fn record_failure(&mut self, id: &NodeId, title: &str) -> Result<(), GraphError> {
        self.tree.add_child(*id, &error_title(title), true);
        Ok(())
    }

    fn record_link(
        &mut self,
        parent: &NodeId,
        link: &str,
        already_visited: bool,
    ) -> Result<Option<NodeId>, GraphError> {
        if already_visited {
            return Ok(None);
        }
        Ok(Some(self.tree.add_child(*parent, link, false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationType;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Unavailable;

    impl fmt::Display for Unavailable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "links unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    /// Pages not listed fail to fetch.
    struct FakeSource {
        pages: HashMap<&'static str, Vec<&'static str>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(pages: &[(&'static str, &[&'static str])]) -> Self {
            Self {
                pages: pages.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LinkSource for FakeSource {
        type Error = Unavailable;

        fn fetch_links(&self, title: &str) -> Result<Vec<String>, Unavailable> {
            self.calls.lock().unwrap().push(title.to_string());
            self.pages
                .get(title)
                .map(|links| links.iter().map(|l| l.to_string()).collect())
                .ok_or(Unavailable)
        }
    }

    fn targets<'g>(graph: &'g WikiGraph, title: &str) -> Vec<&'g str> {
        graph
            .get_outgoing_edges(title)
            .iter()
            .map(|e| e.target.as_str())
            .collect()
    }

    #[test]
    fn test_depth_one_records_links_without_expanding() {
        let source = FakeSource::new(&[("Root", &["A", "B"]), ("A", &["C"])]);
        let graph = PageMapper::new(&source).map("Root", 1, false).unwrap();

        assert_eq!(graph.total_nodes(), 3);
        assert_eq!(targets(&graph, "Root"), vec!["A", "B"]);
        assert!(!graph.contains("C"));
        assert_eq!(graph.max_depth_explored(), 1);
        assert_eq!(source.calls(), vec!["Root"]);
    }

    #[test]
    fn test_depth_first_order_follows_link_order() {
        let source = FakeSource::new(&[
            ("Root", &["A", "B"]),
            ("A", &["A1"]),
            ("B", &["B1"]),
            ("A1", &[]),
            ("B1", &[]),
        ]);
        let graph = PageMapper::new(&source).map("Root", 3, false).unwrap();

        assert_eq!(source.calls(), vec!["Root", "A", "A1", "B", "B1"]);
        assert_eq!(graph.max_depth_explored(), 3);
        assert_eq!(graph.total_nodes(), 5);
    }

    #[test]
    fn test_cycles_are_fetched_once() {
        let source = FakeSource::new(&[("Root", &["A"]), ("A", &["Root", "A"])]);
        let graph = PageMapper::new(&source).map("Root", 5, false).unwrap();

        assert_eq!(source.calls(), vec!["Root", "A"]);
        assert_eq!(targets(&graph, "A"), vec!["Root", "A"]);
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn test_failed_fetch_adds_error_node_when_requested() {
        let source = FakeSource::new(&[("Root", &["Broken"])]);

        let without = PageMapper::new(&source).map("Root", 2, false).unwrap();
        assert_eq!(without.error_count(), 0);
        assert_eq!(without.total_nodes(), 2);

        let with = PageMapper::new(&source).map("Root", 2, true).unwrap();
        assert_eq!(with.error_count(), 1);
        let edges = with.get_outgoing_edges("Broken");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "[ERROR] Broken");
        assert_eq!(edges[0].rel_type, RelationType::Error);
    }

    #[test]
    fn test_root_failure_still_returns_graph() {
        let source = FakeSource::new(&[]);
        let graph = PageMapper::new(&source).map("Root", 2, true).unwrap();
        assert_eq!(graph.total_nodes(), 2);
        assert_eq!(graph.error_count(), 1);
        assert_eq!(graph.max_depth_explored(), 1);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let source = FakeSource::new(&[("Root", &["A"])]);
        let result = PageMapper::new(&source).map("Root", 0, false);
        assert!(matches!(result, Err(ServiceError::PageMapping { source: None, .. })));
        assert!(source.calls().is_empty());
    }

    #[test]
    fn test_empty_root_is_a_mapping_failure() {
        let source = FakeSource::new(&[]);
        let result = PageMapper::new(&source).map("", 2, false);
        assert!(matches!(
            result,
            Err(ServiceError::PageMapping {
                source: Some(GraphError::InvalidTitle(_)),
                ..
            })
        ));
    }

    #[test]
    fn test_empty_root_reports_same_reason_for_graph_and_tree() {
        let source = FakeSource::new(&[]);
        let mapper = PageMapper::new(&source);

        let graph_err = mapper.map("", 2, false).unwrap_err();
        let tree_err = mapper.map_tree("", 2, false).unwrap_err();
        assert_eq!(graph_err.to_string(), tree_err.to_string());
        assert!(graph_err.to_string().contains("root title must be a non-empty string"));
        assert!(source.calls().is_empty());
    }

    #[test]
    fn test_empty_link_aborts_mapping() {
        let source = FakeSource::new(&[("Root", &["A", ""])]);
        let result = PageMapper::new(&source).map("Root", 1, false);
        assert!(matches!(
            result,
            Err(ServiceError::PageMapping {
                source: Some(GraphError::InvalidTitle(_)),
                ..
            })
        ));
    }

    #[test]
    fn test_progress_callback_sees_every_expansion() {
        let source = FakeSource::new(&[("Root", &["A"]), ("A", &[])]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mapper = PageMapper::new(&source).with_progress_callback(Arc::new(move |depth, title| {
            sink.lock().unwrap().push((depth, title));
        }));

        mapper.map("Root", 2, false).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, "Root".to_string()), (2, "A".to_string())]
        );
    }

    #[test]
    fn test_tree_skips_visited_pages() {
        let source = FakeSource::new(&[
            ("Root", &["A", "B"]),
            ("A", &["B", "Root"]),
            ("B", &["C"]),
            ("C", &[]),
        ]);
        let tree = PageMapper::new(&source).map_tree("Root", 3, false).unwrap();

        let titles: Vec<&str> = tree.walk().iter().map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Root", "A", "B", "C"]);
        assert_eq!(tree.total_nodes(), 4);
        assert_eq!(tree.max_depth_reached(), 3);
    }

    #[test]
    fn test_tree_error_child() {
        let source = FakeSource::new(&[("Root", &["Broken"])]);
        let tree = PageMapper::new(&source).map_tree("Root", 2, true).unwrap();

        let (broken, _) = tree.children(PageTree::ROOT).next().unwrap();
        let errors: Vec<&str> = tree.children(broken).map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(errors, vec!["[ERROR] Broken"]);
        assert_eq!(tree.error_count(), 1);
        assert_eq!(tree.total_nodes(), 3);
    }

    #[test]
    fn test_tree_zero_depth_is_rejected() {
        let source = FakeSource::new(&[]);
        assert!(PageMapper::new(&source).map_tree("Root", 0, false).is_err());
    }
}
