use clap::Parser;
use hgc::{
    ClusteringPipeline, EditCostMode, HgcError, IngestSource, PipelineConfig,
    PrecomputedDistances, UnitCosts,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Hierarchical clustering of graphs by graph edit distance.
///
/// The distances are read from a precomputed record file. Building graphs from omics
/// tables needs a distance engine that computes them, which this binary doesn't bundle;
/// use the library with such an engine instead.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Directory of GraphML graph files to cluster
    #[arg(long)]
    graphs: PathBuf,

    /// Node attribute holding node labels in graph files
    #[arg(long, default_value = "")]
    node_label_key: String,

    /// Edge attribute holding edge labels in graph files
    #[arg(long, default_value = "")]
    edge_label_key: String,

    /// Precomputed distance records (`<row>x<col>_<value>_` per line)
    #[arg(long)]
    distance_matrix: PathBuf,

    /// Edit costs: constant, custom or auto
    #[arg(long, default_value = "auto")]
    edit_costs: EditCostMode,

    /// Clinical attribute used to label the leaves; graph names when empty
    #[arg(long, default_value = "")]
    label_attribute: String,

    /// Clustering criterion: nearest point, farthest point, upgma, wpgma, upgmc, wpgmc or incremental
    #[arg(long, default_value = "")]
    criterion: String,

    /// GED method: FAST, STANDARD or TIGHT
    #[arg(long, default_value = "")]
    method: String,

    /// Engine initialization: LAZY or EAGER
    #[arg(long, default_value = "")]
    init_type: String,

    /// Keep the leaf order produced by the linkage instead of optimizing it
    #[arg(long)]
    no_optimal_ordering: bool,

    /// Also write every ingested graph to <out>/export
    #[arg(long)]
    export_graphs: bool,

    /// Open the rendered plots
    #[arg(long)]
    show: bool,

    /// Method arguments as `--option value` pairs, after `--`
    #[arg(last = true)]
    method_args: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), HgcError> {
    let mut builder = PipelineConfig::builder()
        .out_dir(&args.out)
        .label_keys(&args.node_label_key, &args.edge_label_key)
        .edit_cost_mode(args.edit_costs)
        .optimal_ordering(!args.no_optimal_ordering);
    if args.edit_costs == EditCostMode::Custom {
        builder = builder.custom_costs(Arc::new(UnitCosts));
    }
    let config = builder.build();
    let out_dir = config.out_dir().to_path_buf();

    let engine = PrecomputedDistances::new(&args.distance_matrix);
    let mut pipeline = ClusteringPipeline::new(config, Box::new(engine));
    pipeline.configure(
        &args.method,
        &args.method_args.join(" "),
        args.edit_costs == EditCostMode::Custom,
        &args.init_type,
    )?;

    pipeline.ingest(IngestSource::GraphDirectory(args.graphs))?;
    if args.export_graphs {
        pipeline.export_collection(&out_dir)?;
    }

    pipeline.label(&args.label_attribute)?;
    pipeline.compute_distances()?;
    if pipeline.distances().is_none() {
        warn!("Nothing to cluster.");
        return Ok(());
    }
    pipeline.cluster(&args.criterion)?;
    pipeline.build_tree()?;
    pipeline.export(&out_dir, true, args.show)?;
    info!(
        "Done: {} ({} edit costs)",
        pipeline.artifact_name()?,
        pipeline.edit_costs_name()
    );
    Ok(())
}
