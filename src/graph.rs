//! Graph representations: the entity records held by a collection, and the generic
//! attribute graph used at the file boundary.
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

/// A node of an entity graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    pub id: usize,
    pub label: i64,
}

/// An undirected, labelled edge of an entity graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    pub label: f64,
}

/// An entity to be clustered: a named graph with integer node labels and floating point
/// edge labels. Node ids are unique within one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedGraph {
    pub id: usize,
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl AttributedGraph {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node_position(&self, node_id: usize) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == node_id)
    }
}

/// An attribute value of a node or edge in an [`ExchangeGraph`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    /// Converts to an integer the way a lenient numeric cast would: floats are truncated,
    /// booleans become 0 or 1 and strings must spell an integer.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            AttrValue::Bool(b) => Some(i64::from(*b)),
            AttrValue::Int(i) => Some(*i),
            AttrValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            AttrValue::Float(_) => None,
            AttrValue::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Str(s) => s.trim().parse().ok(),
        }
    }

    pub(crate) fn graphml_type(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "boolean",
            AttrValue::Int(_) => "long",
            AttrValue::Float(_) => "double",
            AttrValue::Str(_) => "string",
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Float(x) => write!(f, "{x:?}"),
            AttrValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Identifies an edge of an [`ExchangeGraph`]. Simple graphs key edges by their endpoints,
/// multigraphs add the index among parallel edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKey {
    Pair(String, String),
    Triple(String, String, usize),
}

impl EdgeKey {
    /// Number of components in the key: 2 for endpoint pairs, 3 with a parallel index.
    pub fn len(&self) -> usize {
        match self {
            EdgeKey::Pair(..) => 2,
            EdgeKey::Triple(..) => 3,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        match self {
            EdgeKey::Pair(source, target) | EdgeKey::Triple(source, target, _) => {
                (source.as_str(), target.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeEdge {
    pub source: String,
    pub target: String,
    /// Index among the edges joining the same endpoints; always 0 in simple graphs.
    pub key: usize,
    pub attributes: Attributes,
}

/// A generic attribute graph, as stored in graph exchange files. Nodes are keyed by string
/// ids and kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeGraph {
    directed: bool,
    multigraph: bool,
    nodes: Vec<(String, Attributes)>,
    node_index: HashMap<String, usize>,
    edges: Vec<ExchangeEdge>,
}

impl ExchangeGraph {
    /// Creates an empty, undirected simple graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, undirected graph that keeps parallel edges apart.
    pub fn new_multigraph() -> Self {
        Self {
            multigraph: true,
            ..Self::default()
        }
    }

    pub fn set_directed(&mut self, directed: bool) {
        self.directed = directed;
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn is_multigraph(&self) -> bool {
        self.multigraph
    }

    /// Adds a node, or merges `attributes` into an existing node with the same id.
    pub fn add_node(&mut self, id: impl Into<String>, attributes: Attributes) {
        let id = id.into();
        match self.node_index.get(&id) {
            Some(&position) => self.nodes[position].1.extend(attributes),
            None => {
                self.node_index.insert(id.clone(), self.nodes.len());
                self.nodes.push((id, attributes));
            }
        }
    }

    /// Adds an edge, creating missing endpoints. In a simple graph a repeated edge merges
    /// its attributes into the existing one; in a multigraph it becomes a parallel edge.
    ///
    /// # Returns
    /// * The key of the added or updated edge.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        attributes: Attributes,
    ) -> EdgeKey {
        let source = source.into();
        let target = target.into();
        let directed = self.directed;
        self.add_node(source.clone(), Attributes::new());
        self.add_node(target.clone(), Attributes::new());

        if !self.multigraph {
            if let Some(edge) = self
                .edges
                .iter_mut()
                .find(|edge| joins(edge, &source, &target, directed))
            {
                edge.attributes.extend(attributes);
                return EdgeKey::Pair(source, target);
            }
        }
        let key = self
            .edges
            .iter()
            .filter(|edge| joins(edge, &source, &target, directed))
            .count();
        self.edges.push(ExchangeEdge {
            source: source.clone(),
            target: target.clone(),
            key,
            attributes,
        });
        if self.multigraph {
            EdgeKey::Triple(source, target, key)
        } else {
            EdgeKey::Pair(source, target)
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.nodes.iter().map(|(id, attributes)| (id.as_str(), attributes))
    }

    pub fn node(&self, id: &str) -> Option<&Attributes> {
        self.node_index.get(id).map(|&position| &self.nodes[position].1)
    }

    /// Insertion position of a node, used to derive dense integer ids.
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn edges(&self) -> &[ExchangeEdge] {
        &self.edges
    }

    /// Keys of all edges in insertion order, shaped according to the graph kind.
    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges
            .iter()
            .map(|edge| {
                if self.multigraph {
                    EdgeKey::Triple(edge.source.clone(), edge.target.clone(), edge.key)
                } else {
                    EdgeKey::Pair(edge.source.clone(), edge.target.clone())
                }
            })
            .collect()
    }

    /// Looks up an edge's attributes. A pair key matches the first edge joining the
    /// endpoints, a triple key also matches the parallel index.
    pub fn edge_attributes(&self, key: &EdgeKey) -> Option<&Attributes> {
        let (source, target) = key.endpoints();
        self.edges
            .iter()
            .filter(|edge| joins(edge, source, target, self.directed))
            .find(|edge| match key {
                EdgeKey::Pair(..) => true,
                EdgeKey::Triple(_, _, index) => edge.key == *index,
            })
            .map(|edge| &edge.attributes)
    }
}

fn joins(edge: &ExchangeEdge, source: &str, target: &str, directed: bool) -> bool {
    (edge.source == source && edge.target == target)
        || (!directed && edge.source == target && edge.target == source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_conversions() {
        assert_eq!(AttrValue::Float(2.7).to_int(), Some(2));
        assert_eq!(AttrValue::from(" 12 ").to_int(), Some(12));
        assert_eq!(AttrValue::from("2.5").to_int(), None);
        assert_eq!(AttrValue::from("2.5").to_float(), Some(2.5));
        assert_eq!(AttrValue::Bool(true).to_int(), Some(1));
        assert_eq!(AttrValue::from("abc").to_float(), None);
    }

    #[test]
    fn simple_graph_merges_repeated_edges() {
        let mut graph = ExchangeGraph::new();
        graph.add_edge("a", "b", Attributes::new());
        let key = graph.add_edge(
            "b",
            "a",
            Attributes::from([("w".to_string(), AttrValue::Float(1.5))]),
        );
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(key.len(), 2);
        let attributes = graph.edge_attributes(&key).unwrap();
        assert_eq!(attributes.get("w"), Some(&AttrValue::Float(1.5)));
    }

    #[test]
    fn multigraph_keeps_parallel_edges() {
        let mut graph = ExchangeGraph::new_multigraph();
        graph.add_edge("a", "b", Attributes::new());
        let key = graph.add_edge("a", "b", Attributes::new());
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(key, EdgeKey::Triple("a".into(), "b".into(), 1));
        assert_eq!(graph.edge_keys()[0].len(), 3);
    }

    #[test]
    fn node_positions_follow_insertion_order() {
        let mut graph = ExchangeGraph::new();
        graph.add_node("n7", Attributes::new());
        graph.add_node("n2", Attributes::new());
        graph.add_node("n7", Attributes::new());
        assert_eq!(graph.node_position("n7"), Some(0));
        assert_eq!(graph.node_position("n2"), Some(1));
        assert_eq!(graph.node_count(), 2);
    }
}
