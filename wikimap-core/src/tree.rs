use serde::Serialize;

/// Index of a node inside its [`PageTree`].
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub title: String,
    pub is_error: bool,
    /// Root sits at depth 1.
    pub depth: usize,
    pub children: Vec<NodeId>,
}

/// Tree of first discoveries, stored as an arena with the root at index 0.
#[derive(Debug, Clone, Serialize)]
pub struct PageTree {
    nodes: Vec<TreeNode>,
    total_nodes: usize,
    error_count: usize,
    max_depth_reached: usize,
}

impl PageTree {
    pub(crate) fn new(root_title: &str) -> Self {
        Self {
            nodes: vec![TreeNode {
                title: root_title.to_string(),
                is_error: false,
                depth: 1,
                children: Vec::new(),
            }],
            total_nodes: 1,
            error_count: 0,
            max_depth_reached: 0,
        }
    }

    pub const ROOT: NodeId = 0;

    pub fn root(&self) -> &TreeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&child| (child, &self.nodes[child]))
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn max_depth_reached(&self) -> usize {
        self.max_depth_reached
    }

    /// Pre-order walk yielding every node.
    pub fn walk(&self) -> Vec<(NodeId, &TreeNode)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            order.push((id, node));
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// Adds `title` under `parent`, or returns the existing child with that title.
    pub(crate) fn add_child(&mut self, parent: NodeId, title: &str, is_error: bool) -> NodeId {
        if let Some(&existing) = self.nodes[parent]
            .children
            .iter()
            .find(|&&child| self.nodes[child].title == title)
        {
            return existing;
        }

        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(TreeNode {
            title: title.to_string(),
            is_error,
            depth,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        self.total_nodes += 1;
        if is_error {
            self.error_count += 1;
        }
        id
    }

    pub(crate) fn update_metrics(&mut self, depth: usize) {
        self.max_depth_reached = self.max_depth_reached.max(depth);
    }
}
