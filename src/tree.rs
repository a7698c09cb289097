use crate::data_wrappers::LinkageStep;
use crate::graph::{AttrValue, Attributes, ExchangeGraph};
use crate::HgcError;
use num_traits::Float;

/// Attribute holding the display label of each node of a flattened cluster tree.
pub const TREE_LABEL_KEY: &str = "hgc-label";
const MISSING_LABEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTreeNode<T> {
    pub id: usize,
    pub left: Option<usize>,
    pub right: Option<usize>,
    /// Merge distance; zero for leaves.
    pub distance: T,
    pub size: usize,
}

impl<T> ClusterTreeNode<T> {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A binary merge hierarchy stored as an arena indexed by node id. Leaves are `0..n`,
/// the internal node created by merge `k` is `n + k`, and the root is the last merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTree<T> {
    n_leaves: usize,
    nodes: Vec<ClusterTreeNode<T>>,
}

impl<T: Float> ClusterTree<T> {
    /// Builds the tree of a complete merge sequence over `steps.len() + 1` entities.
    ///
    /// # Returns
    /// * `ShapeError` if a merge refers to a node that doesn't exist yet or has already
    ///   been merged.
    pub fn from_steps(steps: &[LinkageStep<T>]) -> Result<Self, HgcError> {
        let n_leaves = steps.len() + 1;
        let mut nodes: Vec<ClusterTreeNode<T>> = (0..n_leaves)
            .map(|id| ClusterTreeNode {
                id,
                left: None,
                right: None,
                distance: T::zero(),
                size: 1,
            })
            .collect();
        let mut merged = vec![false; 2 * n_leaves - 1];

        for (k, step) in steps.iter().enumerate() {
            let id = n_leaves + k;
            for child in [step.left, step.right] {
                if child >= id || merged[child] || step.left == step.right {
                    return Err(HgcError::ShapeError(format!(
                        "merge {k} can't use node {child} as a child of node {id}"
                    )));
                }
            }
            merged[step.left] = true;
            merged[step.right] = true;
            nodes.push(ClusterTreeNode {
                id,
                left: Some(step.left),
                right: Some(step.right),
                distance: step.distance,
                size: nodes[step.left].size + nodes[step.right].size,
            });
        }
        Ok(ClusterTree { n_leaves, nodes })
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node(&self, id: usize) -> Option<&ClusterTreeNode<T>> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[ClusterTreeNode<T>] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.n_leaves
    }

    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.n_leaves
    }

    /// Display label of a node: the entity label for leaves, or "N/A" when `labels` has
    /// no entry for it; the merge distance rounded to two decimals for internal nodes.
    pub fn display_label(&self, id: usize, labels: &[String]) -> String {
        match self.nodes.get(id) {
            Some(node) if node.is_leaf() => labels
                .get(id)
                .cloned()
                .unwrap_or_else(|| MISSING_LABEL.to_string()),
            Some(node) => format_distance(node.distance),
            None => MISSING_LABEL.to_string(),
        }
    }

    /// Leaf ids from left to right.
    pub fn leaf_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.n_leaves);
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                order.push(id);
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        order
    }

    /// Flattens the tree into an undirected graph with one node per tree node, labelled
    /// under [`TREE_LABEL_KEY`], and an edge from every internal node to each child.
    /// Nodes are visited depth first, left child before right.
    pub fn to_graph(&self, labels: &[String]) -> ExchangeGraph {
        let mut graph = ExchangeGraph::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            graph.add_node(
                id.to_string(),
                Attributes::from([(
                    TREE_LABEL_KEY.to_string(),
                    AttrValue::Str(self.display_label(id, labels)),
                )]),
            );
            for child in [node.left, node.right].into_iter().flatten() {
                graph.add_edge(id.to_string(), child.to_string(), Attributes::new());
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        graph
    }
}

/// Rounds a merge distance to two decimals, always showing at least one. Non-finite
/// distances are printed as they are.
pub fn format_distance<T: Float>(distance: T) -> String {
    let Some(value) = distance.to_f64() else {
        return MISSING_LABEL.to_string();
    };
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}
