//! The staged clustering run: configure the distance engine, ingest graphs, label them,
//! compute distances, cluster, build the cluster tree and export it.
//!
//! Each stage fills one slot of the pipeline and needs the slots of the stages it depends
//! on. Re-running a stage clears the slots derived from it; a failing stage leaves every
//! slot as it was.
use crate::bridge::{self, GRAPH_EXTENSION};
use crate::collection::{GraphCollection, GraphStore};
use crate::config::{EditCostMode, PipelineConfig};
use crate::data_wrappers::LinkageStep;
use crate::engine::{
    DistanceEngine, EditCostStrategy, EngineConfig, GedMethod, InitType, MethodArguments,
    TabularSource,
};
use crate::graph::ExchangeGraph;
use crate::graphml::write_graphml_file;
use crate::labeling::{generate_labels, AttributeTable};
use crate::linkage::{Agglomerative, LinkageCriterion, LinkageEngine};
use crate::render::{NoRenderer, Renderer};
use crate::symmetrize::{condense, symmetrize};
use crate::tree::ClusterTree;
use crate::validation::MatrixValidator;
use crate::HgcError;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stages of a clustering run, in the order they are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Configured,
    Ingested,
    Labeled,
    DistanceComputed,
    Clustered,
    TreeBuilt,
    Exported,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Configured => "Configured",
            Stage::Ingested => "Ingested",
            Stage::Labeled => "Labeled",
            Stage::DistanceComputed => "DistanceComputed",
            Stage::Clustered => "Clustered",
            Stage::TreeBuilt => "TreeBuilt",
            Stage::Exported => "Exported",
        };
        write!(f, "{name}")
    }
}

/// Where the graphs of a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestSource {
    /// Omics, clinical and cost tables, turned into graphs by the distance engine.
    Tabular(TabularSource),
    /// A directory of graph files.
    GraphDirectory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Tabular,
    GraphFiles,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Tabular => write!(f, "tabular data"),
            SourceKind::GraphFiles => write!(f, "graph files"),
        }
    }
}

/// Sequences the stages of one clustering run. One instance per run; stage calls must
/// not overlap.
pub struct ClusteringPipeline {
    config: PipelineConfig,
    engine: Box<dyn DistanceEngine>,
    linkage_engine: Box<dyn LinkageEngine<f64>>,
    renderer: Box<dyn Renderer>,

    engine_config: Option<EngineConfig>,
    collection: GraphStore,
    attributes: AttributeTable,
    source_kind: Option<SourceKind>,
    sample_graph_count: usize,
    labels: Option<Vec<String>>,
    distances: Option<Vec<Vec<f64>>>,
    criterion: Option<LinkageCriterion>,
    linkage: Option<Vec<LinkageStep<f64>>>,
    tree: Option<ClusterTree<f64>>,
    tree_graph: Option<ExchangeGraph>,
    exported: Option<Vec<PathBuf>>,
}

impl ClusteringPipeline {
    /// Creates a pipeline computing distances with `engine`, clustering with
    /// [`Agglomerative`] and rendering nothing.
    pub fn new(config: PipelineConfig, engine: Box<dyn DistanceEngine>) -> Self {
        ClusteringPipeline {
            config,
            engine,
            linkage_engine: Box::new(Agglomerative),
            renderer: Box::new(NoRenderer),
            engine_config: None,
            collection: GraphStore::new(),
            attributes: AttributeTable::new(),
            source_kind: None,
            sample_graph_count: 0,
            labels: None,
            distances: None,
            criterion: None,
            linkage: None,
            tree: None,
            tree_graph: None,
            exported: None,
        }
    }

    pub fn with_linkage_engine(mut self, linkage_engine: Box<dyn LinkageEngine<f64>>) -> Self {
        self.linkage_engine = linkage_engine;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Configures the distance engine. Clears every stage output, including the ingested
    /// graphs.
    ///
    /// # Parameters
    /// * `method` - GED method name; empty selects BRANCH.
    /// * `method_arguments` - `--option value` pairs passed to the engine.
    /// * `use_custom_edit_costs` - whether to use the costs registered in the configuration.
    /// * `init_type` - LAZY or EAGER; empty selects LAZY.
    ///
    /// # Returns
    /// * `ConfigurationError` if custom costs are requested but none were registered, or
    ///   a name or argument doesn't parse.
    pub fn configure(
        &mut self,
        method: &str,
        method_arguments: &str,
        use_custom_edit_costs: bool,
        init_type: &str,
    ) -> Result<(), HgcError> {
        let edit_costs = if use_custom_edit_costs || self.config.edit_cost_mode == EditCostMode::Custom {
            let costs = self.config.custom_costs.clone().ok_or_else(|| {
                HgcError::ConfigurationError(
                    "custom edit costs were requested but none were registered".to_string(),
                )
            })?;
            EditCostStrategy::Custom(costs)
        } else if self.config.edit_cost_mode == EditCostMode::Constant {
            EditCostStrategy::Constant
        } else {
            EditCostStrategy::Auto
        };
        let arguments = MethodArguments::parse(method_arguments)?;
        if let Some(threads) = arguments.threads()? {
            debug!(threads, "engine thread count");
        }
        let engine_config = EngineConfig {
            method: GedMethod::parse(method)?,
            arguments,
            init_type: InitType::parse(init_type)?,
            edit_costs,
        };
        self.engine.configure(&engine_config)?;
        info!(
            "Configured {} ({} init, {} edit costs)",
            engine_config.method,
            engine_config.init_type.name(),
            engine_config.edit_costs.name()
        );

        self.engine_config = Some(engine_config);
        self.collection = GraphStore::new();
        self.attributes = AttributeTable::new();
        self.source_kind = None;
        self.sample_graph_count = 0;
        self.labels = None;
        self.clear_from(Stage::DistanceComputed);
        Ok(())
    }

    /// Adds graphs to the collection. A run takes its graphs either from tabular data or
    /// from graph files; repeating an ingest from the same kind of source adds to the
    /// collection. Clears the labels and everything derived from the graphs.
    pub fn ingest(&mut self, source: IngestSource) -> Result<(), HgcError> {
        if self.engine_config.is_none() {
            return Err(HgcError::missing(Stage::Configured, "ingest graphs"));
        }
        let kind = match source {
            IngestSource::Tabular(_) => SourceKind::Tabular,
            IngestSource::GraphDirectory(_) => SourceKind::GraphFiles,
        };
        if let Some(previous) = self.source_kind.filter(|previous| *previous != kind) {
            return Err(HgcError::ConfigurationError(format!(
                "graphs were already ingested from {previous}; a run can't also use {kind}"
            )));
        }

        let mut collection = self.collection.clone();
        let mut attributes = self.attributes.clone();
        let mut sample_graph_count = self.sample_graph_count;
        match &source {
            IngestSource::Tabular(tabular) => {
                if let Some(clinical) = &tabular.clinical {
                    attributes.merge(AttributeTable::load(clinical, self.config.separator)?);
                    collection.set_warn_on_duplicate_names(true);
                }
                sample_graph_count += self.engine.load_dataset(tabular, &mut collection)?;
            }
            IngestSource::GraphDirectory(dir) => {
                bridge::import_directory(&mut collection, dir, &self.config.label_keys)?;
            }
        }
        info!(
            "Ingested {} from {kind}, collection holds {} graph(s)",
            collection.graph_count() - self.collection.graph_count(),
            collection.graph_count()
        );

        self.collection = collection;
        self.attributes = attributes;
        self.sample_graph_count = sample_graph_count;
        self.source_kind = Some(kind);
        self.labels = None;
        self.clear_from(Stage::DistanceComputed);
        Ok(())
    }

    /// Derives one display label per graph from the attribute `attribute_name`, or from
    /// the graph names when it is empty. Clears the tree and its exports.
    pub fn label(&mut self, attribute_name: &str) -> Result<(), HgcError> {
        if self.source_kind.is_none() {
            return Err(HgcError::missing(Stage::Ingested, "label graphs"));
        }
        let labels = generate_labels(
            &self.collection,
            &self.attributes,
            attribute_name,
            self.sample_graph_count,
        )?;
        if labels.is_empty() {
            warn!("No labels generated, tree leaves will be labelled N/A.");
        }
        self.labels = Some(labels);
        self.clear_from(Stage::TreeBuilt);
        Ok(())
    }

    /// Computes the distances between all ingested graphs. An empty result leaves the
    /// pipeline without a distance matrix. Clears the clustering and everything after it.
    ///
    /// # Returns
    /// * `PrerequisiteMissing` if the pipeline isn't configured or has no graphs.
    /// * `UndefinedMethod` if the engine has no method.
    pub fn compute_distances(&mut self) -> Result<(), HgcError> {
        if self.engine_config.is_none() {
            return Err(HgcError::missing(Stage::Configured, "compute distances"));
        }
        if self.source_kind.is_none() || self.collection.graph_count() == 0 {
            return Err(HgcError::missing(Stage::Ingested, "compute distances"));
        }
        let method = self.engine.method_name().ok_or(HgcError::UndefinedMethod)?;

        info!("Computing distances between {} graph(s) with {method}", self.collection.graph_count());
        let matrix = self.engine.compute_geds(&self.collection)?;
        let distances = if matrix.is_empty() {
            warn!("The distance engine returned no distances.");
            None
        } else {
            let validator = MatrixValidator::new(&matrix);
            validator.validate_square()?;
            validator.validate_distances()?;
            if matrix.len() != self.collection.graph_count() {
                return Err(HgcError::ShapeError(format!(
                    "{} distance rows for {} graphs",
                    matrix.len(),
                    self.collection.graph_count()
                )));
            }
            Some(matrix)
        };

        self.distances = distances;
        self.clear_from(Stage::Clustered);
        Ok(())
    }

    /// Clusters the entities hierarchically.
    ///
    /// # Parameters
    /// * `criterion` - clustering criterion name, see [`LinkageCriterion::from_name`].
    pub fn cluster(&mut self, criterion: &str) -> Result<(), HgcError> {
        let Some(distances) = &self.distances else {
            return Err(HgcError::missing(Stage::DistanceComputed, "cluster"));
        };
        let criterion = LinkageCriterion::from_name(criterion)?;

        let mut matrix = distances.clone();
        if !MatrixValidator::new(&matrix).is_symmetrical_matrix() {
            debug!("distance matrix is asymmetric, keeping the smaller distance of each pair");
        }
        symmetrize(&mut matrix)?;
        let condensed = condense(&matrix)?;
        let linkage = self.linkage_engine.linkage(
            &condensed,
            matrix.len(),
            criterion,
            self.config.optimal_ordering,
        )?;
        info!("Clustered {} entities with {criterion} linkage", matrix.len());

        self.criterion = Some(criterion);
        self.linkage = Some(linkage);
        self.clear_from(Stage::TreeBuilt);
        Ok(())
    }

    /// Builds the cluster tree and its graph form, labelling the graphs by name first if
    /// they have no labels yet.
    pub fn build_tree(&mut self) -> Result<(), HgcError> {
        let Some(linkage) = &self.linkage else {
            return Err(HgcError::missing(Stage::Clustered, "build the cluster tree"));
        };
        let tree = ClusterTree::from_steps(linkage)?;
        let fallback = match self.labels {
            Some(_) => None,
            None => Some(generate_labels(
                &self.collection,
                &self.attributes,
                "",
                self.sample_graph_count,
            )?),
        };
        let labels = fallback
            .as_deref()
            .or(self.labels.as_deref())
            .unwrap_or_default();
        if !labels.is_empty() && labels.len() != tree.leaf_count() {
            return Err(HgcError::ShapeError(format!(
                "{} labels for {} clustered entities",
                labels.len(),
                tree.leaf_count()
            )));
        }
        let graph = tree.to_graph(labels);
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "built cluster tree");

        if let Some(labels) = fallback {
            self.labels = Some(labels);
        }
        self.tree = Some(tree);
        self.tree_graph = Some(graph);
        self.clear_from(Stage::Exported);
        Ok(())
    }

    /// Writes the tree graph to `<destination>/gml/<criterion>_<method>.gml`. With `save`
    /// the renderer also draws `<destination>/dendrogram/<name>.png` and
    /// `<destination>/clustering/<name>.png`; `show` is passed to the renderer as is.
    pub fn export(
        &mut self,
        destination: impl AsRef<Path>,
        save: bool,
        show: bool,
    ) -> Result<(), HgcError> {
        let (Some(tree), Some(graph)) = (&self.tree, &self.tree_graph) else {
            return Err(HgcError::missing(Stage::TreeBuilt, "export"));
        };
        let name = self.artifact_name()?;
        let destination = destination.as_ref();
        let labels = self.labels.as_deref().unwrap_or_default();

        let gml_dir = destination.join("gml");
        fs::create_dir_all(&gml_dir)?;
        let gml_path = gml_dir.join(format!("{name}.{GRAPH_EXTENSION}"));
        write_graphml_file(graph, &gml_path)?;
        let mut written = vec![gml_path];

        if save {
            let dendrogram = artifact_path(destination, "dendrogram", &name)?;
            let clustering = artifact_path(destination, "clustering", &name)?;
            self.renderer
                .render_dendrogram(tree, labels, Some(dendrogram.as_path()), show)?;
            self.renderer
                .render_graph(graph, Some(clustering.as_path()), show)?;
            written.extend([dendrogram, clustering]);
        } else if show {
            self.renderer.render_dendrogram(tree, labels, None, show)?;
            self.renderer.render_graph(graph, None, show)?;
        }
        info!("Exported {name} to {}", destination.display());

        self.exported = Some(written);
        Ok(())
    }

    /// Clusters, builds the tree and saves every artifact under `out_dir`.
    pub fn run_full(&mut self, out_dir: impl AsRef<Path>, criterion: &str) -> Result<(), HgcError> {
        self.cluster(criterion)?;
        self.build_tree()?;
        self.export(out_dir, true, false)
    }

    /// Common stem of the exported artifacts, `<criterion>_<method>`.
    pub fn artifact_name(&self) -> Result<String, HgcError> {
        let criterion = self
            .criterion
            .ok_or(HgcError::missing(Stage::Clustered, "name artifacts"))?;
        let method = self
            .engine_config
            .as_ref()
            .map(|config| config.method)
            .ok_or(HgcError::missing(Stage::Configured, "name artifacts"))?;
        Ok(format!("{}_{method}", criterion.name()))
    }

    /// Pushes one graph into the collection, as an ingest from graph files would.
    pub fn push_graph(&mut self, graph: &ExchangeGraph, name: &str) -> Result<usize, HgcError> {
        if self.source_kind == Some(SourceKind::Tabular) {
            debug!(graph = name, "adding a graph to a tabular collection");
        }
        let id = bridge::push_graph(&mut self.collection, graph, name, &self.config.label_keys)?;
        self.source_kind.get_or_insert(SourceKind::GraphFiles);
        self.labels = None;
        self.clear_from(Stage::DistanceComputed);
        Ok(id)
    }

    pub fn pull_graph(&self, graph_id: usize) -> Result<ExchangeGraph, HgcError> {
        bridge::pull_graph(&self.collection, graph_id, &self.config.label_keys)
    }

    /// Writes every collected graph to `<out_dir>/export/<graph name>.gml`.
    pub fn export_collection(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, HgcError> {
        bridge::export_collection(&self.collection, out_dir, &self.config.label_keys)
    }

    /// The furthest stage whose output is populated.
    pub fn stage(&self) -> Option<Stage> {
        if self.exported.is_some() {
            Some(Stage::Exported)
        } else if self.tree.is_some() {
            Some(Stage::TreeBuilt)
        } else if self.linkage.is_some() {
            Some(Stage::Clustered)
        } else if self.distances.is_some() {
            Some(Stage::DistanceComputed)
        } else if self.labels.is_some() {
            Some(Stage::Labeled)
        } else if self.source_kind.is_some() {
            Some(Stage::Ingested)
        } else if self.engine_config.is_some() {
            Some(Stage::Configured)
        } else {
            None
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine_config(&self) -> Option<&EngineConfig> {
        self.engine_config.as_ref()
    }

    pub fn method_name(&self) -> Option<String> {
        self.engine.method_name()
    }

    pub fn edit_costs_name(&self) -> String {
        self.engine.edit_costs_name()
    }

    pub fn collection(&self) -> &GraphStore {
        &self.collection
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn distances(&self) -> Option<&[Vec<f64>]> {
        self.distances.as_deref()
    }

    pub fn criterion(&self) -> Option<LinkageCriterion> {
        self.criterion
    }

    pub fn linkage(&self) -> Option<&[LinkageStep<f64>]> {
        self.linkage.as_deref()
    }

    pub fn tree(&self) -> Option<&ClusterTree<f64>> {
        self.tree.as_ref()
    }

    pub fn tree_graph(&self) -> Option<&ExchangeGraph> {
        self.tree_graph.as_ref()
    }

    pub fn exported(&self) -> Option<&[PathBuf]> {
        self.exported.as_deref()
    }

    /// Empties the slot of `stage` and of every stage after it, from distance computation
    /// onwards. Labels are cleared separately since they only depend on the graphs.
    fn clear_from(&mut self, stage: Stage) {
        if stage <= Stage::DistanceComputed {
            self.distances = None;
        }
        if stage <= Stage::Clustered {
            self.criterion = None;
            self.linkage = None;
        }
        if stage <= Stage::TreeBuilt {
            self.tree = None;
            self.tree_graph = None;
        }
        self.exported = None;
    }
}

fn artifact_path(destination: &Path, kind: &str, name: &str) -> Result<PathBuf, HgcError> {
    let dir = destination.join(kind);
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!("{name}.png")))
}
