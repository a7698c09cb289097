use std::collections::BTreeMap;

/// One merge of an agglomerative clustering. Ids below the entity count refer to original
/// entities; an id `n + k` refers to the cluster created by the `k`th merge.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkageStep<T> {
    pub left: usize,
    pub right: usize,
    pub distance: T,
    /// Number of entities in the merged cluster.
    pub size: usize,
}

/// A graph as exposed by a [`GraphCollection`](crate::GraphCollection): adjacency matrix,
/// per-node labels and labels for every present edge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphData {
    pub adjacency: Vec<Vec<bool>>,
    pub node_labels: Vec<i64>,
    pub edge_labels: BTreeMap<(usize, usize), f64>,
}

#[derive(Clone, Debug)]
pub(crate) struct MSTEdge<T> {
    pub(crate) left_node_id: usize,
    pub(crate) right_node_id: usize,
    pub(crate) distance: T,
}
