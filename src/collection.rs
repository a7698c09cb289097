use crate::data_wrappers::GraphData;
use crate::graph::{AttributedGraph, GraphEdge, GraphNode};
use crate::HgcError;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A collection of entity graphs addressed by dense integer ids, as hosted by a distance
/// engine. Graph ids are assigned in insertion order starting from 0.
pub trait GraphCollection {
    /// Adds an empty graph under `name` and returns its id.
    fn add_graph(&mut self, name: &str) -> usize;

    fn add_node(&mut self, graph_id: usize, node_id: usize, label: i64) -> Result<(), HgcError>;

    fn add_edge(
        &mut self,
        graph_id: usize,
        from: usize,
        to: usize,
        label: f64,
    ) -> Result<(), HgcError>;

    /// Rebuilds any cached state that depends on the graphs' topology. Called after a
    /// batch of graphs has been pushed.
    fn reinitialize(&mut self) -> Result<(), HgcError>;

    fn graph_count(&self) -> usize;

    fn graph_name(&self, graph_id: usize) -> Result<String, HgcError>;

    /// Adjacency, node labels and edge labels of one graph. Node positions in the
    /// adjacency matrix follow node insertion order.
    fn graph(&self, graph_id: usize) -> Result<GraphData, HgcError>;
}

/// In-memory [`GraphCollection`].
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graphs: Vec<AttributedGraph>,
    generation: u64,
    warn_on_duplicate_names: bool,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether adding a graph under an existing name logs a warning. Enabled once sample
    /// attributes are loaded, since attributes are matched to graphs by name.
    pub fn set_warn_on_duplicate_names(&mut self, warn: bool) {
        self.warn_on_duplicate_names = warn;
    }

    pub fn graphs(&self) -> &[AttributedGraph] {
        &self.graphs
    }

    pub fn get(&self, graph_id: usize) -> Option<&AttributedGraph> {
        self.graphs.get(graph_id)
    }

    /// Number of times the collection has been reinitialized.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    fn graph_mut(&mut self, graph_id: usize) -> Result<&mut AttributedGraph, HgcError> {
        self.graphs
            .get_mut(graph_id)
            .ok_or_else(|| unknown_graph(graph_id))
    }
}

impl GraphCollection for GraphStore {
    fn add_graph(&mut self, name: &str) -> usize {
        if self.warn_on_duplicate_names && self.graphs.iter().any(|graph| graph.name == name) {
            warn!(
                "Collection already contains a graph named \"{name}\". \
                Attribute data may be associated with the wrong graph."
            );
        }
        let id = self.graphs.len();
        self.graphs.push(AttributedGraph::new(id, name));
        id
    }

    fn add_node(&mut self, graph_id: usize, node_id: usize, label: i64) -> Result<(), HgcError> {
        let graph = self.graph_mut(graph_id)?;
        if graph.node_position(node_id).is_some() {
            return Err(HgcError::UnknownEntity(format!(
                "graph \"{}\" already contains node {node_id}",
                graph.name
            )));
        }
        graph.nodes.push(GraphNode { id: node_id, label });
        Ok(())
    }

    fn add_edge(
        &mut self,
        graph_id: usize,
        from: usize,
        to: usize,
        label: f64,
    ) -> Result<(), HgcError> {
        let graph = self.graph_mut(graph_id)?;
        for endpoint in [from, to] {
            if graph.node_position(endpoint).is_none() {
                return Err(HgcError::UnknownEntity(format!(
                    "graph \"{}\" has no node {endpoint}",
                    graph.name
                )));
            }
        }
        graph.edges.push(GraphEdge { from, to, label });
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<(), HgcError> {
        self.generation += 1;
        debug!(graphs = self.graphs.len(), generation = self.generation, "collection reinitialized");
        Ok(())
    }

    fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    fn graph_name(&self, graph_id: usize) -> Result<String, HgcError> {
        self.get(graph_id)
            .map(|graph| graph.name.clone())
            .ok_or_else(|| unknown_graph(graph_id))
    }

    fn graph(&self, graph_id: usize) -> Result<GraphData, HgcError> {
        let graph = self.get(graph_id).ok_or_else(|| unknown_graph(graph_id))?;
        let n = graph.nodes.len();
        let mut adjacency = vec![vec![false; n]; n];
        let mut edge_labels = BTreeMap::new();
        for edge in &graph.edges {
            let (Some(from), Some(to)) = (graph.node_position(edge.from), graph.node_position(edge.to))
            else {
                continue;
            };
            adjacency[from][to] = true;
            adjacency[to][from] = true;
            edge_labels.insert((from, to), edge.label);
            edge_labels.insert((to, from), edge.label);
        }
        Ok(GraphData {
            adjacency,
            node_labels: graph.nodes.iter().map(|node| node.label).collect(),
            edge_labels,
        })
    }
}

fn unknown_graph(graph_id: usize) -> HgcError {
    HgcError::UnknownEntity(format!("no graph with id {graph_id} in the collection"))
}
