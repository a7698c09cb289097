//! Hierarchical clustering of graphs by graph edit distance ("HGC") in Rust.
//!
//! A run ingests a collection of labelled graphs, either built by a distance engine from
//! tabular omics data or read from GraphML files, computes the pairwise distances between
//! them, clusters them agglomeratively and turns the merge hierarchy into a labelled tree
//! that can be exported as a graph.
//!
//! The stages are sequenced by [`ClusteringPipeline`]. The pieces it is built from can be
//! used on their own: [`DistanceMatrixParser`] reads the row-keyed distance text format,
//! [`symmetrize`] reconciles asymmetric distances, [`Agglomerative`] computes linkages and
//! [`ClusterTree`] converts them into a graph.
//!
//! # Examples
//! ```
//!use hgc::{condense, symmetrize, Agglomerative, ClusterTree, DistanceMatrixParser};
//!use hgc::{LinkageCriterion, LinkageEngine};
//!
//!let text = "0x0_0_\n0x1_5_\n0x2_9_\n1x0_9_\n1x1_0_\n1x2_4_\n2x0_9_\n2x1_4_\n2x2_0_\n";
//!let mut matrix: Vec<Vec<f64>> = DistanceMatrixParser::new()
//!    .parse_str(text)
//!    .unwrap()
//!    .into_iter()
//!    .map(|row| row.into_iter().map(|d| d as f64).collect())
//!    .collect();
//!symmetrize(&mut matrix).unwrap();
//!assert_eq!(matrix[0][1], 5.0);
//!
//!let condensed = condense(&matrix).unwrap();
//!let steps = Agglomerative
//!    .linkage(&condensed, 3, LinkageCriterion::Single, false)
//!    .unwrap();
//!let tree = ClusterTree::from_steps(&steps).unwrap();
//!let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
//!let graph = tree.to_graph(&labels);
//!assert_eq!(graph.node_count(), 5);
//!assert_eq!(graph.edge_count(), 4);
//! ```
//!
//! # References
//! * [Bar-Joseph, Z.; Gifford, D.K.; Jaakkola, T.S. Fast optimal leaf ordering for hierarchical clustering.](https://doi.org/10.1093/bioinformatics/17.suppl_1.S22)
//! * [GraphML specification](http://graphml.graphdrawing.org/specification.html)

pub use crate::bridge::{
    export_collection, import_directory, pull_graph, push_graph, LabelKeys,
    DEFAULT_EDGE_LABEL_KEY, DEFAULT_NODE_LABEL_KEY, GRAPH_EXTENSION,
};
pub use crate::collection::{GraphCollection, GraphStore};
pub use crate::config::{EditCostMode, PipelineConfig, PipelineConfigBuilder};
pub use crate::data_wrappers::{GraphData, LinkageStep};
pub use crate::engine::{
    DistanceEngine, EditCostStrategy, EditCosts, EngineConfig, GedMethod, InitType,
    MethodArguments, PrecomputedDistances, TabularSource, UnitCosts,
};
pub use crate::error::HgcError;
pub use crate::graph::{
    AttrValue, AttributedGraph, Attributes, EdgeKey, ExchangeEdge, ExchangeGraph, GraphEdge,
    GraphNode,
};
pub use crate::graphml::{
    read_graphml, read_graphml_file, to_graphml_string, write_graphml, write_graphml_file,
};
pub use crate::labeling::{generate_labels, AttributeTable};
pub use crate::linkage::{Agglomerative, LinkageCriterion, LinkageEngine};
pub use crate::matrix_parser::{write_distance_matrix, DistanceMatrixParser};
pub use crate::pipeline::{ClusteringPipeline, IngestSource, Stage};
pub use crate::render::{NoRenderer, Renderer};
pub use crate::symmetrize::{condense, condensed_index, symmetrize};
pub use crate::tree::{format_distance, ClusterTree, ClusterTreeNode, TREE_LABEL_KEY};

mod bridge;
mod collection;
mod config;
mod data_wrappers;
mod engine;
mod error;
mod graph;
mod graphml;
mod labeling;
mod linkage;
mod matrix_parser;
mod pipeline;
mod render;
mod symmetrize;
mod tree;
mod validation;
