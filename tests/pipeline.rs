use hgc::{
    read_graphml_file, write_distance_matrix, write_graphml_file, AttrValue, Attributes,
    ClusterTree, ClusteringPipeline, DistanceEngine, EditCostMode, EngineConfig, ExchangeGraph,
    GraphCollection, HgcError, IngestSource, LinkageCriterion, LinkageEngine, LinkageStep,
    PipelineConfig,
    PrecomputedDistances, Renderer, Stage, TabularSource, UnitCosts, DEFAULT_NODE_LABEL_KEY,
    TREE_LABEL_KEY,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Engine returning a fixed matrix, and building one small graph per sample name when
/// asked to load tabular data.
struct FixedEngine {
    matrix: Vec<Vec<f64>>,
    samples: Vec<&'static str>,
    configured: Option<EngineConfig>,
    report_method: bool,
}

impl FixedEngine {
    fn new(matrix: Vec<Vec<f64>>) -> Self {
        FixedEngine {
            matrix,
            samples: vec!["S1", "S2", "S3", "S4"],
            configured: None,
            report_method: true,
        }
    }
}

impl DistanceEngine for FixedEngine {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), HgcError> {
        self.configured = Some(config.clone());
        Ok(())
    }

    fn method_name(&self) -> Option<String> {
        self.configured
            .as_ref()
            .filter(|_| self.report_method)
            .map(|config| config.method.name().to_string())
    }

    fn edit_costs_name(&self) -> String {
        self.configured
            .as_ref()
            .map(|config| config.edit_costs.name().to_string())
            .unwrap_or_default()
    }

    fn load_dataset(
        &mut self,
        _source: &TabularSource,
        collection: &mut dyn GraphCollection,
    ) -> Result<usize, HgcError> {
        for name in &self.samples {
            let id = collection.add_graph(name);
            collection.add_node(id, 0, 1)?;
        }
        Ok(self.samples.len())
    }

    fn compute_geds(&mut self, _collection: &dyn GraphCollection) -> Result<Vec<Vec<f64>>, HgcError> {
        Ok(self.matrix.clone())
    }
}

/// Linkage engine that leaves the last entity out of every tree.
struct ShortLinkage;

impl LinkageEngine<f64> for ShortLinkage {
    fn linkage(
        &self,
        _condensed: &[f64],
        _n_samples: usize,
        _criterion: LinkageCriterion,
        _optimal_ordering: bool,
    ) -> Result<Vec<LinkageStep<f64>>, HgcError> {
        Ok(vec![
            LinkageStep { left: 0, right: 1, distance: 1.0, size: 2 },
            LinkageStep { left: 2, right: 3, distance: 2.0, size: 3 },
        ])
    }
}

#[derive(Default, Clone)]
struct RecordingRenderer {
    targets: Rc<RefCell<Vec<PathBuf>>>,
}

impl Renderer for RecordingRenderer {
    fn render_dendrogram(
        &self,
        _tree: &ClusterTree<f64>,
        _labels: &[String],
        target: Option<&Path>,
        _show: bool,
    ) -> Result<(), HgcError> {
        self.targets.borrow_mut().extend(target.map(Path::to_path_buf));
        Ok(())
    }

    fn render_graph(
        &self,
        _graph: &ExchangeGraph,
        target: Option<&Path>,
        _show: bool,
    ) -> Result<(), HgcError> {
        self.targets.borrow_mut().extend(target.map(Path::to_path_buf));
        Ok(())
    }
}

fn two_groups() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 1.0, 8.0, 9.0],
        vec![1.5, 0.0, 7.0, 8.0],
        vec![8.0, 7.0, 0.0, 2.0],
        vec![9.0, 8.0, 2.0, 0.0],
    ]
}

fn pipeline() -> ClusteringPipeline {
    ClusteringPipeline::new(PipelineConfig::default(), Box::new(FixedEngine::new(two_groups())))
}

fn tabular(dir: &Path) -> IngestSource {
    IngestSource::Tabular(TabularSource {
        omics: dir.join("omics.csv"),
        ..TabularSource::default()
    })
}

fn configured_and_clustered(dir: &Path) -> ClusteringPipeline {
    let mut pipeline = pipeline();
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(tabular(dir)).unwrap();
    pipeline.compute_distances().unwrap();
    pipeline.cluster("upgma").unwrap();
    pipeline
}

fn write_graph_dir(dir: &Path, names: &[&str]) {
    for (i, name) in names.iter().enumerate() {
        let mut graph = ExchangeGraph::new();
        for node in 0..=i {
            graph.add_node(
                format!("n{node}"),
                Attributes::from([(DEFAULT_NODE_LABEL_KEY.to_string(), AttrValue::Int(node as i64))]),
            );
        }
        write_graphml_file(&graph, dir.join(format!("{name}.gml"))).unwrap();
    }
}

#[test]
fn compute_before_configure() {
    let mut pipeline = pipeline();
    let result = pipeline.compute_distances();
    assert!(matches!(
        result,
        Err(HgcError::PrerequisiteMissing { stage: Stage::Configured, .. })
    ));
}

#[test]
fn export_before_build_tree() {
    let dir = tempfile::tempdir().unwrap();
    let mut fresh = pipeline();
    assert!(matches!(
        fresh.export(dir.path(), false, false),
        Err(HgcError::PrerequisiteMissing { stage: Stage::TreeBuilt, .. })
    ));

    let mut clustered = configured_and_clustered(dir.path());
    assert!(matches!(
        clustered.export(dir.path(), true, false),
        Err(HgcError::PrerequisiteMissing { stage: Stage::TreeBuilt, .. })
    ));
    assert!(clustered.linkage().is_some());
}

#[test]
fn stages_need_their_prerequisites() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline();
    assert!(matches!(
        pipeline.ingest(tabular(dir.path())),
        Err(HgcError::PrerequisiteMissing { stage: Stage::Configured, .. })
    ));
    assert!(matches!(
        pipeline.cluster("upgma"),
        Err(HgcError::PrerequisiteMissing { stage: Stage::DistanceComputed, .. })
    ));
    assert!(matches!(
        pipeline.build_tree(),
        Err(HgcError::PrerequisiteMissing { stage: Stage::Clustered, .. })
    ));

    pipeline.configure("fast", "--threads 2", false, "eager").unwrap();
    assert!(matches!(
        pipeline.label(""),
        Err(HgcError::PrerequisiteMissing { stage: Stage::Ingested, .. })
    ));
    assert!(matches!(
        pipeline.compute_distances(),
        Err(HgcError::PrerequisiteMissing { stage: Stage::Ingested, .. })
    ));
    assert_eq!(pipeline.stage(), Some(Stage::Configured));
}

#[test]
fn custom_costs_must_be_registered() {
    let mut pipeline = pipeline();
    assert!(matches!(
        pipeline.configure("", "", true, ""),
        Err(HgcError::ConfigurationError(..))
    ));
    assert_eq!(pipeline.stage(), None);

    let config = PipelineConfig::builder()
        .edit_cost_mode(EditCostMode::Custom)
        .custom_costs(Arc::new(UnitCosts))
        .build();
    let mut pipeline = ClusteringPipeline::new(config, Box::new(FixedEngine::new(two_groups())));
    pipeline.configure("", "", true, "").unwrap();
    assert_eq!(pipeline.edit_costs_name(), "custom");
}

#[test]
fn configuration_errors() {
    let mut pipeline = pipeline();
    for (method, arguments, init_type) in [("ipfp", "", ""), ("", "--threads", ""), ("", "", "later")] {
        assert!(matches!(
            pipeline.configure(method, arguments, false, init_type),
            Err(HgcError::ConfigurationError(..))
        ));
    }
}

#[test]
fn undefined_method() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = FixedEngine::new(two_groups());
    engine.report_method = false;
    let mut pipeline = ClusteringPipeline::new(PipelineConfig::default(), Box::new(engine));
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(tabular(dir.path())).unwrap();
    assert!(matches!(pipeline.compute_distances(), Err(HgcError::UndefinedMethod)));
}

#[test]
fn criterion_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = configured_and_clustered(dir.path());
    let table = [
        ("nearest point", LinkageCriterion::Single),
        ("farthest point", LinkageCriterion::Complete),
        ("upgma", LinkageCriterion::Average),
        ("wpgma", LinkageCriterion::Weighted),
        ("upgmc", LinkageCriterion::Centroid),
        ("wpgmc", LinkageCriterion::Median),
        ("incremental", LinkageCriterion::Ward),
        ("", LinkageCriterion::Average),
    ];
    for (name, expected) in table {
        pipeline.cluster(name).unwrap();
        assert_eq!(pipeline.criterion(), Some(expected), "{name}");
    }

    let before = pipeline.linkage().map(<[_]>::to_vec);
    assert!(matches!(pipeline.cluster("diana"), Err(HgcError::NotImplemented(..))));
    assert!(matches!(pipeline.cluster("agnes"), Err(HgcError::AmbiguousCriterion(..))));
    assert!(matches!(pipeline.cluster("k-means"), Err(HgcError::InvalidCriterion(..))));
    assert_eq!(pipeline.linkage().map(<[_]>::to_vec), before);
    assert_eq!(pipeline.criterion(), Some(LinkageCriterion::Average));
}

#[test]
fn asymmetric_distances_use_the_smaller_value() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = configured_and_clustered(dir.path());
    assert_eq!(pipeline.distances().unwrap()[1][0], 1.5);
    let first = &pipeline.linkage().unwrap()[0];
    assert_eq!((first.left, first.right, first.distance), (0, 1, 1.0));
}

#[test]
fn tabular_run_with_clinical_labels() {
    let dir = tempfile::tempdir().unwrap();
    let clinical = dir.path().join("clinical.csv");
    fs::write(&clinical, "sample,stage\nS1,I\nS2,I\nS3,III\n").unwrap();

    let renderer = RecordingRenderer::default();
    let mut pipeline = pipeline().with_renderer(Box::new(renderer.clone()));
    pipeline.configure("tight", "", false, "").unwrap();
    pipeline
        .ingest(IngestSource::Tabular(TabularSource {
            omics: dir.path().join("omics.csv"),
            clinical: Some(clinical),
            costs: None,
            use_costs: false,
        }))
        .unwrap();
    pipeline.label("stage").unwrap();
    assert_eq!(pipeline.labels().unwrap(), &["0_I", "1_I", "2_III", "3_S4"]);

    pipeline.compute_distances().unwrap();
    pipeline.run_full(dir.path().join("out"), "farthest point").unwrap();
    assert_eq!(pipeline.stage(), Some(Stage::Exported));
    assert_eq!(pipeline.artifact_name().unwrap(), "complete_BRANCH_TIGHT");

    let out = dir.path().join("out");
    let gml = out.join("gml").join("complete_BRANCH_TIGHT.gml");
    assert_eq!(
        *renderer.targets.borrow(),
        vec![
            out.join("dendrogram").join("complete_BRANCH_TIGHT.png"),
            out.join("clustering").join("complete_BRANCH_TIGHT.png"),
        ]
    );
    assert_eq!(pipeline.exported().unwrap()[0], gml);

    let graph = read_graphml_file(&gml).unwrap();
    assert_eq!(graph.node_count(), 7);
    assert_eq!(graph.edge_count(), 6);
    let leaf = graph.node("2").and_then(|attrs| attrs.get(TREE_LABEL_KEY));
    assert_eq!(leaf, Some(&AttrValue::from("2_III")));
}

#[test]
fn graph_directory_run() {
    let dir = tempfile::tempdir().unwrap();
    let graphs = dir.path().join("graphs");
    fs::create_dir(&graphs).unwrap();
    write_graph_dir(&graphs, &["d", "c", "b", "a"]);
    let ged = dir.path().join("ged.csv");
    fs::write(&ged, write_distance_matrix(&[
        vec![0, 3, 9, 9],
        vec![3, 0, 9, 9],
        vec![9, 9, 0, 1],
        vec![9, 9, 1, 0],
    ]))
    .unwrap();

    let engine = PrecomputedDistances::new(&ged);
    let mut pipeline = ClusteringPipeline::new(PipelineConfig::default(), Box::new(engine));
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(IngestSource::GraphDirectory(graphs.clone())).unwrap();
    assert_eq!(pipeline.collection().graph_name(0).unwrap(), "a");
    assert_eq!(pipeline.collection().graph(3).unwrap().node_labels, vec![0]);

    pipeline.compute_distances().unwrap();
    pipeline.cluster("wpgma").unwrap();
    pipeline.build_tree().unwrap();
    assert_eq!(pipeline.labels().unwrap(), &["0_a", "1_b", "2_c", "3_d"]);
    let tree = pipeline.tree().unwrap();
    assert_eq!(tree.display_label(tree.root(), pipeline.labels().unwrap()), "9.0");

    let out = dir.path().join("out");
    pipeline.export(&out, false, false).unwrap();
    assert!(out.join("gml").join("weighted_BRANCH.gml").is_file());
    assert!(!out.join("dendrogram").exists());

    let exported = pipeline.export_collection(&out).unwrap();
    assert_eq!(exported.len(), 4);
    assert!(out.join("export").join("c.gml").is_file());

    assert!(matches!(
        pipeline.ingest(IngestSource::Tabular(TabularSource::default())),
        Err(HgcError::ConfigurationError(..))
    ));
    assert_eq!(pipeline.stage(), Some(Stage::Exported));
}

#[test]
fn rerunning_a_stage_clears_what_depends_on_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = configured_and_clustered(dir.path());
    pipeline.build_tree().unwrap();
    assert_eq!(pipeline.stage(), Some(Stage::TreeBuilt));
    assert_eq!(pipeline.labels().unwrap().len(), 4);

    pipeline.label("").unwrap();
    assert!(pipeline.tree().is_none());
    assert!(pipeline.linkage().is_some());
    assert_eq!(pipeline.stage(), Some(Stage::Clustered));

    pipeline.build_tree().unwrap();
    pipeline.cluster("ward").unwrap();
    assert!(pipeline.tree().is_none());
    assert!(pipeline.tree_graph().is_none());

    pipeline.compute_distances().unwrap();
    assert!(pipeline.linkage().is_none());
    assert!(pipeline.labels().is_some());

    pipeline.configure("", "", false, "").unwrap();
    assert_eq!(pipeline.collection().graph_count(), 0);
    assert_eq!(pipeline.stage(), Some(Stage::Configured));
}

#[test]
fn empty_distances_mean_no_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline =
        ClusteringPipeline::new(PipelineConfig::default(), Box::new(FixedEngine::new(Vec::new())));
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(tabular(dir.path())).unwrap();
    pipeline.compute_distances().unwrap();
    assert!(pipeline.distances().is_none());
    assert!(matches!(
        pipeline.cluster("upgma"),
        Err(HgcError::PrerequisiteMissing { stage: Stage::DistanceComputed, .. })
    ));
}

#[test]
fn pushed_graphs_round_trip() {
    let mut pipeline = pipeline();
    let mut graph = ExchangeGraph::new();
    graph.add_node("a", Attributes::from([(DEFAULT_NODE_LABEL_KEY.to_string(), AttrValue::Int(5))]));
    graph.add_edge("a", "b", Attributes::new());
    let id = pipeline.push_graph(&graph, "g").unwrap();
    assert_eq!(pipeline.stage(), Some(Stage::Ingested));

    let pulled = pipeline.pull_graph(id).unwrap();
    assert_eq!(pulled.node_count(), 2);
    assert_eq!(pulled.edge_count(), 1);
    assert_eq!(
        pulled.node("0").and_then(|attrs| attrs.get(DEFAULT_NODE_LABEL_KEY)),
        Some(&AttrValue::Int(5))
    );
}

#[test]
fn empty_graph_directory_has_nothing_to_compare() {
    let dir = tempfile::tempdir().unwrap();
    let graphs = dir.path().join("graphs");
    fs::create_dir(&graphs).unwrap();
    let ged = dir.path().join("ged.csv");
    fs::write(&ged, write_distance_matrix(&[vec![0, 1], vec![1, 0]])).unwrap();

    let engine = PrecomputedDistances::new(&ged);
    let mut pipeline = ClusteringPipeline::new(PipelineConfig::default(), Box::new(engine));
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(IngestSource::GraphDirectory(graphs)).unwrap();
    assert_eq!(pipeline.collection().graph_count(), 0);
    assert!(matches!(
        pipeline.compute_distances(),
        Err(HgcError::PrerequisiteMissing { stage: Stage::Ingested, .. })
    ));
    assert!(pipeline.distances().is_none());
}

#[test]
fn failed_build_tree_keeps_labels_unset() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline().with_linkage_engine(Box::new(ShortLinkage));
    pipeline.configure("", "", false, "").unwrap();
    pipeline.ingest(tabular(dir.path())).unwrap();
    pipeline.compute_distances().unwrap();
    pipeline.cluster("upgma").unwrap();
    assert!(pipeline.labels().is_none());

    assert!(matches!(pipeline.build_tree(), Err(HgcError::ShapeError(..))));
    assert!(pipeline.labels().is_none());
    assert!(pipeline.tree().is_none());
    assert_eq!(pipeline.stage(), Some(Stage::Clustered));
}

#[test]
fn artifacts_are_named_after_the_requested_method() {
    let dir = tempfile::tempdir().unwrap();
    let ged = dir.path().join("ged.csv");
    fs::write(&ged, write_distance_matrix(&[vec![0, 1], vec![1, 0]])).unwrap();

    let engine = PrecomputedDistances::new(&ged);
    let mut pipeline = ClusteringPipeline::new(PipelineConfig::default(), Box::new(engine));
    pipeline.configure("fast", "", false, "").unwrap();
    let mut graph = ExchangeGraph::new();
    graph.add_node("a", Attributes::new());
    pipeline.push_graph(&graph, "x").unwrap();
    pipeline.push_graph(&graph, "y").unwrap();
    pipeline.compute_distances().unwrap();
    pipeline.cluster("nearest point").unwrap();
    assert_eq!(pipeline.method_name().as_deref(), Some("PRECOMPUTED"));
    assert_eq!(pipeline.artifact_name().unwrap(), "single_BRANCH_FAST");
}
